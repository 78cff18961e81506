use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use hie_core::physics;
use hie_types::{BaseUrl, BasicCredentials};
use hl7::{AckCode, LocalEndpoint, Message, MessageIdGenerator};
use openehr::OpenEhrClient;
use serde_json::{Map, Value};

const DEFAULT_EHRBASE_URL: &str = "http://localhost:8001/ehrbase/rest";

#[derive(Parser)]
#[command(name = "hie")]
#[command(about = "Administration and inspection tools for the HIE labs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete every EHR and template of an EHRbase server (admin API)
    ResetEhrbase {
        #[arg(long, env = "EHRBASE_URL", default_value = DEFAULT_EHRBASE_URL)]
        url: String,
        #[arg(long, env = "EHRBASE_ADMIN_USERNAME", default_value = "ehrbase-admin")]
        username: String,
        #[arg(long, env = "EHRBASE_ADMIN_PASSWORD", default_value = "EvenMoreSecretPassword")]
        password: String,
    },
    /// List the operational templates installed in EHRbase
    ListTemplates {
        #[arg(long, env = "EHRBASE_URL", default_value = DEFAULT_EHRBASE_URL)]
        url: String,
        #[arg(long, env = "EHRBASE_USERNAME", default_value = "ehrbase-user")]
        username: String,
        #[arg(long, env = "EHRBASE_PASSWORD", default_value = "SuperSecretPassword")]
        password: String,
    },
    /// Convert a temperature from Celsius to Fahrenheit and Kelvin
    ConvertCelsius {
        #[arg(allow_negative_numbers = true)]
        celsius: f64,
    },
    /// Compute the two missing electrical quantities from two known ones
    Electricity {
        #[arg(long, allow_negative_numbers = true)]
        voltage: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        resistance: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        current: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        power: Option<f64>,
    },
    /// Print the segments and fields of an HL7v2 message
    Hl7Inspect {
        /// File holding the message
        file: PathBuf,
    },
    /// Print the acknowledgment of an HL7v2 message
    Hl7Ack {
        /// File holding the message
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = Code::Aa)]
        code: Code,
        /// Prefix of the acknowledgment's message control id
        #[arg(long, default_value = "MSG_ID_")]
        prefix: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Code {
    Aa,
    Ae,
    Ar,
}

impl From<Code> for AckCode {
    fn from(code: Code) -> Self {
        match code {
            Code::Aa => AckCode::Accept,
            Code::Ae => AckCode::Error,
            Code::Ar => AckCode::Reject,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::ResetEhrbase {
            url,
            username,
            password,
        } => {
            let client = ehrbase_client(&url, username, password)?;
            client.reset().await?;
            println!("EHRbase at {} is now empty", url);
        }
        Commands::ListTemplates {
            url,
            username,
            password,
        } => {
            let client = ehrbase_client(&url, username, password)?;
            let templates = client.list_templates().await?;
            if templates.is_empty() {
                println!("No templates found.");
            }
            for template in templates {
                println!("{}", template);
            }
        }
        Commands::ConvertCelsius { celsius } => {
            let conversion = physics::convert_celsius(celsius);
            println!("{}", serde_json::to_string_pretty(&conversion)?);
        }
        Commands::Electricity {
            voltage,
            resistance,
            current,
            power,
        } => {
            let known = known_quantities(&[
                ("voltage", voltage),
                ("resistance", resistance),
                ("current", current),
                ("power", power),
            ]);
            let computed = physics::compute_electricity(&known)?;
            println!("{}", serde_json::to_string_pretty(&computed)?);
        }
        Commands::Hl7Inspect { file } => {
            let message = read_message(&file)?;
            print!("{}", describe(&message));
        }
        Commands::Hl7Ack { file, code, prefix } => {
            let message = read_message(&file)?;
            let ack = hl7::build_ack(
                &message,
                code.into(),
                &MessageIdGenerator::new(prefix).next(),
                &hl7::dtm::format_now(),
                &LocalEndpoint::default(),
            )?;
            // Segments are separated by carriage returns on the wire.
            println!("{}", ack.to_string().replace('\r', "\n"));
        }
    }

    Ok(())
}

fn ehrbase_client(
    url: &str,
    username: String,
    password: String,
) -> Result<OpenEhrClient, Box<dyn std::error::Error>> {
    Ok(OpenEhrClient::new(
        BaseUrl::parse(url)?,
        BasicCredentials::new(username, password),
    ))
}

fn known_quantities(values: &[(&str, Option<f64>)]) -> Map<String, Value> {
    values
        .iter()
        .filter_map(|(name, value)| {
            let number = serde_json::Number::from_f64((*value)?)?;
            Some((name.to_string(), Value::Number(number)))
        })
        .collect()
}

fn read_message(file: &Path) -> Result<Message, Box<dyn std::error::Error>> {
    let data = std::fs::read(file)?;
    Ok(hl7::parse_message(&data)?)
}

/// One line per non-empty field, numbered as in the HL7 standard (`PID-5`).
fn describe(message: &Message) -> String {
    let mut out = String::new();
    for segment in message.all_segments() {
        out.push_str(segment.name());
        out.push('\n');
        for n in 1..segment.len() {
            let value = segment.field(n);
            if !value.is_empty() {
                out.push_str(&format!("  {}-{}: {}\n", segment.name(), n, value));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn only_given_quantities_are_known() {
        let known = known_quantities(&[
            ("voltage", None),
            ("resistance", Some(5.0)),
            ("current", Some(6.0)),
            ("power", None),
        ]);
        assert_eq!(known.len(), 2);
        let computed = physics::compute_electricity(&known).expect("two quantities");
        assert_eq!(computed["voltage"].as_f64(), Some(30.0));
        assert_eq!(computed["power"].as_f64(), Some(180.0));
    }

    #[test]
    fn describes_fields_with_standard_numbers() {
        let message = hl7::parse_message(
            b"MSH|^~\\&|SENDER|HOSP|||20180301110000||ADT^A04|CTRL-1|P|2.5\rPID|||C-1||Doe^John",
        )
        .expect("valid message");
        let text = describe(&message);
        assert!(text.contains("  MSH-3: SENDER\n"));
        assert!(text.contains("  MSH-9: ADT^A04\n"));
        assert!(text.contains("  PID-3: C-1\n"));
        assert!(text.contains("  PID-5: Doe^John\n"));
        assert!(!text.contains("PID-4"));
    }

    #[test]
    fn parses_negative_celsius() {
        let cli = Cli::try_parse_from(["hie", "convert-celsius", "-10.3"]).expect("valid");
        assert!(matches!(cli.command, Commands::ConvertCelsius { celsius } if celsius == -10.3));
    }
}
