//! Command handlers.

use tokio::sync::watch;

use shop_core::{CartLine, CartSnapshot, Credentials, NewAccount, Session, UserProfile};
use shop_sync::{credential, ShopClient};

use crate::cli::{CartCommand, Command};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub async fn execute(client: &ShopClient, command: Command, json: bool) -> CmdResult {
    match command {
        Command::Login { email, password } => {
            let user = client
                .session()
                .login(Credentials::new(email, password))
                .await?;
            print_user(&user, json)
        }

        Command::Register {
            username,
            firstname,
            email,
            password,
        } => {
            let account = NewAccount {
                username,
                firstname,
                email,
                password,
            };
            let user = client.session().register(account).await?;
            wait_for_login(client).await?;
            print_user(&user, json)
        }

        Command::Logout => {
            client.session().logout().await;
            println!("Signed out");
            Ok(())
        }

        Command::Whoami => whoami(client, json),

        Command::Cart(cmd) => cart(client, cmd, json).await,

        // Handled before the client starts.
        Command::Config(_) => Ok(()),
    }
}

/// Waits for the login that registration starts in the background.
async fn wait_for_login(client: &ShopClient) -> CmdResult {
    let session = client.session();
    let deadline = client.config().request_timeout() * 2;

    match tokio::time::timeout(deadline, login_outcome(session.subscribe(), session.error())).await
    {
        Ok(result) => result,
        Err(_) => Err("Account created, but sign-in did not finish in time".into()),
    }
}

async fn login_outcome(
    mut sessions: watch::Receiver<Session>,
    mut errors: watch::Receiver<Option<String>>,
) -> CmdResult {
    // The background login may have finished before we subscribed.
    if sessions.borrow().is_authenticated() {
        return Ok(());
    }
    if let Some(message) = errors.borrow_and_update().clone() {
        return Err(format!("Account created, but sign-in failed: {message}").into());
    }

    loop {
        tokio::select! {
            changed = sessions.wait_for(Session::is_authenticated) => {
                changed?;
                return Ok(());
            }
            changed = errors.changed() => {
                changed?;
                let message = errors.borrow_and_update().clone();
                if let Some(message) = message {
                    return Err(format!("Account created, but sign-in failed: {message}").into());
                }
            }
        }
    }
}

fn whoami(client: &ShopClient, json: bool) -> CmdResult {
    let session = client.session();
    let Some(user) = session.current_user() else {
        println!("Not signed in");
        return Ok(());
    };

    let expires_at = session
        .token()
        .and_then(|t| credential::decode_claims(&t).ok())
        .and_then(|c| c.expires_at());

    if json {
        let value = serde_json::json!({
            "user": user,
            "admin": session.is_admin(),
            "expired": session.is_token_expired(),
            "expiresAt": expires_at.map(|t| t.to_rfc3339()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} <{}> (id {})", user.username, user.email, user.id);
    if session.is_admin() {
        println!("role: admin");
    }
    match expires_at {
        Some(t) => println!("token expires: {}", t.to_rfc3339()),
        None => println!("token expiry unknown"),
    }
    Ok(())
}

async fn cart(client: &ShopClient, cmd: CartCommand, json: bool) -> CmdResult {
    let cart = client.cart();

    match cmd {
        CartCommand::Show => {
            cart.load().await?;
        }
        CartCommand::Add {
            product_id,
            quantity,
        } => {
            let line = cart.add(product_id, quantity).await?;
            if !json {
                print_line("added", &line);
            }
            cart.load().await?;
        }
        CartCommand::Update { line_id, quantity } => {
            match cart.update_line(line_id, quantity).await? {
                Some(line) if !json => print_line("updated", &line),
                _ => {}
            }
            cart.load().await?;
        }
        CartCommand::Remove { line_id } => {
            cart.remove_line(line_id).await?;
            cart.load().await?;
        }
        CartCommand::Clear => {
            cart.clear().await?;
            if let Some(message) = cart.last_error() {
                eprintln!("warning: {message}");
            }
        }
    }

    print_cart(&cart.snapshot(), json)
}

// =============================================================================
// Output
// =============================================================================

fn print_user(user: &UserProfile, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string_pretty(user)?);
    } else {
        println!("Signed in as {} <{}>", user.username, user.email);
    }
    Ok(())
}

fn print_line(action: &str, line: &CartLine) {
    println!(
        "{action}: {} x{} = {}",
        line.product.name, line.quantity, line.total_price
    );
}

fn print_cart(snapshot: &CartSnapshot, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("Cart is empty");
        return Ok(());
    }

    for line in snapshot.lines() {
        let id = line
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{id:>6}  {:<30} {:>4} x {:>10} = {:>10}",
            line.product.name, line.quantity, line.product.price, line.total_price
        );
    }
    println!(
        "{} items, total {}",
        snapshot.total_items(),
        snapshot.total_amount()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_login_outcome_sees_error_published_before_subscribing() {
        let (_session_tx, sessions) = watch::channel(Session::default());
        let (_error_tx, errors) = watch::channel(Some("Invalid email or password".to_string()));

        let outcome = tokio::time::timeout(Duration::from_millis(200), login_outcome(sessions, errors))
            .await
            .expect("outcome should be immediate");

        let err = outcome.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Account created, but sign-in failed: Invalid email or password"
        );
    }

    #[tokio::test]
    async fn test_login_outcome_waits_for_later_error() {
        let (_session_tx, sessions) = watch::channel(Session::default());
        let (error_tx, errors) = watch::channel(None);

        let publish = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            error_tx.send_replace(Some("boom".to_string()));
        };

        let (outcome, ()) = tokio::time::timeout(Duration::from_secs(1), async {
            tokio::join!(login_outcome(sessions, errors), publish)
        })
        .await
        .unwrap();
        assert!(outcome.is_err());
    }
}
