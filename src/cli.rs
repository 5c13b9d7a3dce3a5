//! Interface de linha de comando do awxclient baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (build, relay)
//! e a flag global `--verbose`.

use clap::{Parser, Subcommand};

/// Lança os jobs AWX de pós-instalação (breakglass e baseline) para este host.
#[derive(Debug, Parser)]
#[command(name = "awxclient", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa os jobs de pós-instalação do Foreman neste host.
    #[command(alias = "foreman")]
    Build {
        /// Porta do relay para hosts midtier e edge.
        #[arg(long)]
        relay_port: Option<u16>,

        /// Simula o build para este FQDN sem lançar jobs nem limpar o host.
        #[arg(long, short, value_name = "FQDN")]
        mock: Option<String>,

        /// Local alternativo do JSON de vars do AWX, arquivo local ou URL.
        #[arg(long, short, value_name = "PATH_OR_URL")]
        file: Option<String>,
    },

    /// Sobe o relay HTTP que executa builds em nome de hosts midtier e edge.
    Relay {
        /// Porta de escuta.
        #[arg(long, short)]
        port: Option<u16>,

        /// Log em nível debug.
        #[arg(long, default_value_t = false)]
        debug: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_build_subcommand() {
        let cli = Cli::parse_from(["awxclient", "build", "--mock", "test.example.com"]);
        match cli.command {
            Command::Build {
                relay_port,
                mock,
                file,
            } => {
                assert_eq!(mock.as_deref(), Some("test.example.com"));
                assert!(relay_port.is_none());
                assert!(file.is_none());
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn foreman_is_an_alias_for_build() {
        let cli = Cli::parse_from([
            "awxclient",
            "foreman",
            "--relay-port",
            "9000",
            "-f",
            "/tmp/vars.json",
        ]);
        match cli.command {
            Command::Build {
                relay_port, file, ..
            } => {
                assert_eq!(relay_port, Some(9000));
                assert_eq!(file.as_deref(), Some("/tmp/vars.json"));
            }
            _ => panic!("expected Build command"),
        }
    }

    #[test]
    fn cli_parses_relay_with_global_verbose() {
        let cli = Cli::parse_from(["awxclient", "--verbose", "relay", "--port", "8081", "--debug"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Relay { port, debug } => {
                assert_eq!(port, Some(8081));
                assert!(debug);
            }
            _ => panic!("expected Relay command"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
