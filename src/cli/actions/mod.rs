pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        session_secret: SecretString,
        base_url: String,
        email_url: Option<String>,
    },
}
