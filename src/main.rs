use std::path::Path;
use std::process::ExitCode;

use sap_assist::{display_text, logging, AssistConfig, AssistError, ChatService, Exchange};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::error;

const HELP: &str = "Comandos: /new, /history, /open <id>, /share, /delete <id>, /audio <ruta>, /quit";

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_from_env();

    let config = match AssistConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            eprintln!("sap-assist: {err}");
            return ExitCode::FAILURE;
        }
    };
    let service = match ChatService::from_config(&config) {
        Ok(service) => service,
        Err(err) => {
            error!(%err, "failed to start");
            eprintln!("sap-assist: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&service).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sap-assist: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(service: &ChatService) -> Result<(), AssistError> {
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut current: Option<String> = None;

    print(&mut stdout, &format!("{}\n{HELP}\n", service.welcome_message())).await?;

    loop {
        print(&mut stdout, "> ").await?;
        let Some(line) = lines
            .next_line()
            .await
            .map_err(|source| AssistError::io("reading input", "<stdin>", source))?
        else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let open = current.clone();
        let outcome = match command {
            "/quit" | "/exit" => break,
            "/help" => Ok(HELP.to_owned()),
            "/new" => {
                current = None;
                Ok(service.welcome_message().to_owned())
            }
            "/history" => history(service),
            "/open" if !argument.is_empty() => service.open(argument).map(|log| {
                current = Some(log.chat.id.clone());
                log.messages
                    .iter()
                    .map(|message| format_turn(&message.content, message.is_user))
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }),
            "/share" => match open.as_deref() {
                Some(chat_id) => service.share(chat_id),
                None => Ok("No hay ningún chat abierto.".to_owned()),
            },
            "/delete" if !argument.is_empty() => service.delete(argument).map(|()| {
                if open.as_deref() == Some(argument) {
                    current = None;
                }
                format!("Chat {argument} eliminado.")
            }),
            "/audio" if !argument.is_empty() => service
                .send_audio(open.as_deref(), Path::new(argument))
                .await
                .map(|exchange| after_exchange(&mut current, exchange)),
            _ if command.starts_with('/') => Ok(HELP.to_owned()),
            _ => service
                .send_message(open.as_deref(), line)
                .await
                .map(|exchange| after_exchange(&mut current, exchange)),
        };

        match outcome {
            Ok(output) => print(&mut stdout, &format!("{output}\n")).await?,
            Err(err) => {
                error!(%err, command, "command failed");
                eprintln!("error: {err}");
            }
        }
    }
    Ok(())
}

fn after_exchange(current: &mut Option<String>, exchange: Exchange) -> String {
    *current = Some(exchange.chat.id);
    format_turn(&exchange.reply.content, false)
}

fn history(service: &ChatService) -> Result<String, AssistError> {
    let chats = service.history()?;
    if chats.is_empty() {
        return Ok("Sin chats guardados.".to_owned());
    }
    Ok(chats
        .iter()
        .map(|chat| {
            let marker = if chat.is_public { " (público)" } else { "" };
            format!("{}  {}{marker}  {}", chat.id, chat.updated_at, chat.title)
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

fn format_turn(content: &str, is_user: bool) -> String {
    let speaker = if is_user { "tú" } else { "asistente" };
    format!("[{speaker}]\n{}", display_text(content, is_user))
}

async fn print(stdout: &mut io::Stdout, text: &str) -> Result<(), AssistError> {
    let written = match stdout.write_all(text.as_bytes()).await {
        Ok(()) => stdout.flush().await,
        Err(error) => Err(error),
    };
    written.map_err(|source| AssistError::io("writing output", "<stdout>", source))
}
