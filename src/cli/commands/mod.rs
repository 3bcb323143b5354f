pub mod database;
pub mod logging;
pub mod vault;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("federa")
        .about("Read-only user federation against a legacy account database")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("FEDERA_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = database::with_args(command);
    let command = vault::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
pub(crate) mod test_support {
    const ENV: [&str; 12] = [
        "FEDERA_PORT",
        "FEDERA_DSN",
        "FEDERA_DB_USER",
        "FEDERA_DB_PASSWORD",
        "FEDERA_COMPONENT_ID",
        "FEDERA_VAULT_URL",
        "FEDERA_VAULT_ROLE_ID",
        "FEDERA_VAULT_SECRET_ID",
        "FEDERA_VAULT_WRAPPED_TOKEN",
        "FEDERA_VAULT_DB_ROLE",
        "FEDERA_LOG_LEVEL",
        "RUST_LOG",
    ];

    // Run `f` with only `vars` set among the FEDERA_* variables.
    pub(crate) fn with_env<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let env: Vec<(&str, Option<&str>)> = ENV
            .iter()
            .map(|&key| {
                let value = vars.iter().find(|(k, _)| *k == key).map(|&(_, v)| v);
                (key, value)
            })
            .collect();
        temp_env::with_vars(env, f)
    }

    pub(crate) fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        with_env(&[], f)
    }
}
