use crate::cli::actions::Action;
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one("dsn")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?,
        session_secret: matches
            .get_one("session-secret")
            .map(|s: &String| SecretString::from(s.as_str()))
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --session-secret"))?,
        base_url: matches
            .get_one("base-url")
            .map_or_else(|| "https://scoutline.app".to_string(), String::to_string),
        email_url: matches.get_one("email-url").map(String::to_string),
    })
}
