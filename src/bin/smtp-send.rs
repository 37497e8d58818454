use anyhow::{bail, Context, Result};
use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use tmp_smtpd::smtp::data::stuff;

/// Sends one scripted test message to an SMTP server.
#[derive(Debug, StructOpt)]
#[structopt(name = "smtp-send")]
struct Opt {
    #[structopt(long, default_value = "localhost")]
    host: String,

    #[structopt(long, default_value = "25")]
    port: u16,

    #[structopt(long, default_value = "test@example.com")]
    from: String,

    #[structopt(long, default_value = "recipient@example.com")]
    to: String,
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("failed to connect to {}:{}", host, port))?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    async fn reply(&mut self) -> Result<String> {
        let reply = self
            .lines
            .next_line()
            .await?
            .context("server closed the connection")?;
        tracing::info!("Server: {}", reply);
        Ok(reply)
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(format!("{}\r\n", line).as_bytes()).await?;
        Ok(())
    }

    /// Send a command and require a reply with the given code.
    async fn command(&mut self, command: &str, expect: &str) -> Result<()> {
        tracing::info!("Client: {}", command);
        self.write_line(command).await?;

        let reply = self.reply().await?;
        if !reply.starts_with(expect) {
            bail!("unexpected reply to {}: {}", command, reply);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let opt = Opt::from_args();

    let mut client = Client::connect(&opt.host, opt.port).await?;
    client.reply().await?;

    client.command("HELO testclient.local", "250").await?;
    client
        .command(&format!("MAIL FROM:<{}>", opt.from), "250")
        .await?;
    client.command(&format!("RCPT TO:<{}>", opt.to), "250").await?;
    client.command("DATA", "354").await?;

    let body = [
        "Subject: Test Email".to_string(),
        format!("From: {}", opt.from),
        format!("To: {}", opt.to),
        String::new(),
        "This is a test email sent to the SMTP server.".to_string(),
        "It contains multiple lines of content.".to_string(),
        ".A line that starts with a dot survives the trip.".to_string(),
        String::new(),
        "Best regards,".to_string(),
        "SMTP Test Client".to_string(),
    ];
    tracing::info!("Client: [Sending {} body lines]", body.len());
    for line in &body {
        client.write_line(&stuff(line)).await?;
    }

    client.command(".", "250").await?;
    client.command("QUIT", "221").await?;

    tracing::info!("Email sent successfully");
    Ok(())
}
