use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use career_code::auth::{CookieConfig, IssueRequest, SameSite, SigningSecret, TokenCodec};
use career_code::{CorsPolicy, DatabaseConfig, ServerConfig, load_secret, serve};

#[derive(Parser)]
#[command(name = "career-code")]
#[command(about = "Career Code job board API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the signing secret comes from. Values are never echoed in help output.
#[derive(Args)]
struct SecretArgs {
    /// Signing secret, at least 32 bytes
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
    /// File holding the signing secret; ignored when --jwt-secret is set
    #[arg(long, env = "JWT_SECRET_FILE")]
    jwt_secret_file: Option<PathBuf>,
}

impl SecretArgs {
    fn load(self) -> Result<SigningSecret> {
        Ok(load_secret(self.jwt_secret, self.jwt_secret_file)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the job board HTTP API
    Server {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(short, long, env = "PORT", default_value = "3000")]
        port: u16,
        #[arg(long, env = "CAREER_DB_URL", default_value = "memory")]
        db_url: String,
        #[command(flatten)]
        secret: SecretArgs,
        /// Comma-separated origins allowed to send credentialed requests
        #[arg(long, env = "CORS_ALLOWED_ORIGINS", default_value = career_code::cors::DEFAULT_ALLOWED_ORIGIN)]
        allowed_origins: String,
        /// Mark the credential cookie Secure; disable only for local plain-HTTP development
        #[arg(long, env = "COOKIE_SECURE", default_value_t = true, action = clap::ArgAction::Set)]
        cookie_secure: bool,
        /// SameSite policy for the credential cookie: strict, lax or none
        #[arg(long, env = "COOKIE_SAME_SITE", default_value = "lax")]
        cookie_same_site: SameSite,
    },
    /// Mint a credential with the configured secret and print it
    IssueToken {
        #[arg(long)]
        identity: String,
        #[command(flatten)]
        secret: SecretArgs,
    },
    /// Verify a credential and print its claims
    VerifyToken {
        token: String,
        #[command(flatten)]
        secret: SecretArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("career_code=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            host,
            port,
            db_url,
            secret,
            allowed_origins,
            cookie_secure,
            cookie_same_site,
        } => {
            let mut config = ServerConfig::new(secret.load()?);
            config.host = host;
            config.port = port;
            config.database = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            config.cors = CorsPolicy::from_list(&allowed_origins);
            config.cookies = CookieConfig {
                secure: cookie_secure,
                same_site: cookie_same_site,
                ..CookieConfig::default()
            };

            info!("Starting Career Code server on {}", config.bind_address());
            serve(config).await?;
        }
        Commands::IssueToken { identity, secret } => {
            let secret = secret.load()?;
            let codec = TokenCodec::new(&secret);
            let token = codec.issue(&IssueRequest::new(identity))?;
            info!(kid = %codec.key_id(), "Issued credential");
            println!("{}", token);
        }
        Commands::VerifyToken { token, secret } => {
            let secret = secret.load()?;
            let codec = TokenCodec::new(&secret);
            match codec.verify(&token) {
                Ok(claims) => println!("{}", serde_json::to_string_pretty(&claims)?),
                Err(err) => {
                    println!("invalid: {} ({})", err.kind(), err);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
