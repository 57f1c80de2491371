use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::Path,
    sync::mpsc as std_mpsc,
    thread,
};

use anyhow::{anyhow, Context, Result};

use crate::{
    cli::{Cli, Command},
    domain::{self, events::TypingStateChanged, ids::SenderId, presence::PresenceSignal},
    infra::{self, error::AppError},
    service::{
        self,
        actor::{spawn_presence_service, PresenceHandle, ServiceError},
        transport::{spawn_outbound, LogSink, OutboundTransport},
    },
    usecases::{
        self, bootstrap,
        context::AppContext,
        contracts::{PresenceSendError, PresenceTransport},
        script::{parse_line, ScriptCommand},
        typing_registry::RegistryStats,
    },
};

const SCRIPT_LINE_REJECTED: &str = "SCRIPT_LINE_REJECTED";
const OUTPUT_WRITER_PANICKED: &str = "OUTPUT_WRITER_PANICKED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptSummary {
    pub executed: usize,
    pub rejected: usize,
    pub stats: RegistryStats,
}

/// One line of driver output.
///
/// Sent signals and typing transitions are pushed from inside the presence
/// actor, answers from the script loop after the actor replied. A single
/// writer drains the channel, so lines appear in the order the service
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScriptOutput {
    Sent(PresenceSignal),
    Changed(TypingStateChanged),
    Answer(String),
}

impl From<TypingStateChanged> for ScriptOutput {
    fn from(change: TypingStateChanged) -> Self {
        Self::Changed(change)
    }
}

impl fmt::Display for ScriptOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent(signal) => write!(f, "send {} {}", signal.conversation, signal.action),
            Self::Changed(change) => {
                let state = if change.is_typing { "typing" } else { "idle" };
                write!(f, "state {} {state}", change.endpoint)
            }
            Self::Answer(line) => f.write_str(line),
        }
    }
}

/// Records each accepted signal in the output stream, then queues it for
/// delivery.
struct ScriptTransport {
    outbound: OutboundTransport,
    output: std_mpsc::Sender<ScriptOutput>,
}

impl PresenceTransport for ScriptTransport {
    fn send_presence(&self, signal: &PresenceSignal) -> Result<(), PresenceSendError> {
        self.outbound.send_presence(signal)?;
        let _ = self.output.send(ScriptOutput::Sent(signal.clone()));
        Ok(())
    }
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command_or_default() {
        Command::Run { script } => {
            let context = bootstrap::bootstrap(cli.config.as_deref())?;
            tracing::debug!(
                domain = domain::module_name(),
                usecases = usecases::module_name(),
                service = service::module_name(),
                infra = infra::module_name(),
                "module boundaries loaded"
            );

            let reader = open_script(script.as_deref())?;
            let summary = run_script(&context, reader, io::stdout())?;
            tracing::info!(
                executed = summary.executed,
                rejected = summary.rejected,
                conversations = summary.stats.conversations,
                endpoints = summary.stats.endpoints,
                "event script finished"
            );
        }
    }

    Ok(())
}

fn open_script(path: Option<&Path>) -> Result<Box<dyn BufRead>, AppError> {
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|source| AppError::ScriptRead {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Runs every script line against a fresh presence service, writing driver
/// output to `out`, then shuts the service down and waits for the outbound
/// queue to drain.
pub fn run_script<W>(context: &AppContext, reader: impl BufRead, out: W) -> Result<ScriptSummary>
where
    W: Write + Send + 'static,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("typecue-worker")
        .enable_time()
        .build()
        .map_err(AppError::RuntimeBuild)?;

    let (output_tx, output_rx) = std_mpsc::channel();
    let writer = thread::Builder::new()
        .name("typecue-output".to_owned())
        .spawn(move || write_output(output_rx, out))
        .context("failed to spawn output writer")?;

    let (handle, actor, outbound) = runtime
        .block_on(async {
            let (outbound_transport, outbound) = spawn_outbound(LogSink);
            let transport = ScriptTransport {
                outbound: outbound_transport,
                output: output_tx.clone(),
            };
            let (handle, actor) = spawn_presence_service(
                context.settings.clone(),
                transport,
                context.config.service.mailbox_capacity,
            );
            handle.forward_changes(output_tx.clone()).await?;
            Ok::<_, ServiceError>((handle, actor, outbound))
        })
        .context("failed to subscribe to typing changes")?;

    let mut summary = ScriptSummary::default();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("failed to read script line {line_no}"))?;

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(error) => {
                reject_line(&mut summary, line_no, error.code(), &error);
                continue;
            }
        };

        match runtime.block_on(execute(&handle, command)) {
            Ok(answer) => {
                summary.executed += 1;
                if let Some(answer) = answer {
                    let _ = output_tx.send(ScriptOutput::Answer(answer));
                }
            }
            Err(ServiceError::Route(error)) => {
                reject_line(&mut summary, line_no, error.code(), &error);
            }
            Err(ServiceError::Closed) => {
                return Err(anyhow!("presence service stopped unexpectedly"));
            }
        }
    }

    summary.stats = runtime.block_on(async move {
        handle.shutdown().await?;
        drop(handle);
        let stats = actor.await.context("presence actor failed")?;
        outbound.await.context("outbound queue failed")?;
        Ok::<_, anyhow::Error>(stats)
    })?;

    drop(output_tx);
    match writer.join() {
        Ok(written) => written.context("failed to write script output")?,
        Err(_) => tracing::warn!(code = OUTPUT_WRITER_PANICKED, "script output writer panicked"),
    }

    Ok(summary)
}

fn reject_line(
    summary: &mut ScriptSummary,
    line_no: usize,
    code: &'static str,
    error: &dyn std::error::Error,
) {
    summary.rejected += 1;
    tracing::warn!(
        code = SCRIPT_LINE_REJECTED,
        reason = code,
        line = line_no,
        error = %error,
        "script line rejected"
    );
    eprintln!("{}", rejection_message(line_no, code, error));
}

fn rejection_message(line_no: usize, code: &str, error: &dyn std::error::Error) -> String {
    format!("line {line_no}: {error} [{code}]")
}

fn write_output(outputs: std_mpsc::Receiver<ScriptOutput>, mut out: impl Write) -> io::Result<()> {
    for line in outputs {
        writeln!(out, "{line}")?;
        out.flush()?;
    }
    Ok(())
}

/// Executes one script command. Queries return the line to print.
async fn execute(
    handle: &PresenceHandle,
    command: ScriptCommand,
) -> Result<Option<String>, ServiceError> {
    match command {
        ScriptCommand::Type(conversation) => handle.input_was_typed(&conversation).await?,
        ScriptCommand::Sent(conversation) => handle.message_was_sent(&conversation).await?,
        ScriptCommand::Started {
            endpoint,
            conversation,
        } => {
            handle
                .did_receive_typing_started(endpoint, conversation)
                .await?
        }
        ScriptCommand::Stopped(endpoint) => handle.did_receive_typing_stopped(endpoint).await?,
        ScriptCommand::Message(endpoint) => handle.did_receive_ordinary_message(endpoint).await?,
        ScriptCommand::Query(sender) => {
            let typing = handle.is_typing_visible(sender.clone()).await?;
            let answer = if typing { "yes" } else { "no" };
            return Ok(Some(format!("typing {sender} {answer}")));
        }
        ScriptCommand::Who(conversation) => {
            let senders = handle.typing_senders_in(conversation.clone()).await?;
            let list = if senders.is_empty() {
                "-".to_owned()
            } else {
                senders
                    .iter()
                    .map(SenderId::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            };
            return Ok(Some(format!("who {conversation} {list}")));
        }
        ScriptCommand::Wait(duration) => tokio::time::sleep(duration).await,
        ScriptCommand::Enable => handle.set_enabled(true).await?,
        ScriptCommand::Disable => handle.set_enabled(false).await?,
    }

    Ok(None)
}
