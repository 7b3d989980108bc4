//! Command-line client for an essay pipeline agent.
//!
//! Usage: `essay-client [--url URL] [--skill write_essay|edit_style] [TEXT...]`
//!
//! Without TEXT the topic (or text to edit) is read from stdin.

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::{bail, Context};
use essay_pipeline::a2a::client::completed_text;
use essay_pipeline::a2a::A2aClient;
use essay_pipeline::{Skill, TaskState};

const DEFAULT_URL: &str = "http://localhost:8000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

struct Args {
    url: String,
    skill: Option<Skill>,
    text: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut url = DEFAULT_URL.to_string();
    let mut skill = None;
    let mut words = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--url" => url = args.next().context("--url needs a value")?,
            "--skill" => {
                let id = args.next().context("--skill needs a value")?;
                let parsed = Skill::from_id(&id).with_context(|| format!("Unknown skill: {}", id))?;
                skill = Some(parsed);
            }
            "-h" | "--help" => {
                println!(
                    "Usage: essay-client [--url URL] [--skill write_essay|edit_style] [TEXT...]"
                );
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            _ => words.push(arg),
        }
    }

    let text = if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    };
    Ok(Args { url, skill, text })
}

fn read_stdin(skill: Option<Skill>) -> anyhow::Result<String> {
    let prompt = match skill {
        Some(Skill::EditStyle) => "Text to edit: ",
        _ => "Essay topic: ",
    };
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let client = A2aClient::new(&args.url, REQUEST_TIMEOUT)?;

    let card = client
        .agent_card()
        .await
        .with_context(|| format!("Failed to fetch agent card from {}", args.url))?;
    let skills: Vec<&str> = card.skills.iter().map(|s| s.id.as_str()).collect();
    eprintln!("Connected to {} ({})", card.name, skills.join(", "));

    let text = match args.text {
        Some(text) => text,
        None => read_stdin(args.skill)?,
    };
    if text.is_empty() {
        bail!("Nothing to send");
    }

    let task = client.send_text(&text, args.skill).await?;
    match task.status.state {
        TaskState::Completed => println!("{}", completed_text(&task)?),
        TaskState::Failed => bail!(
            "Task {} failed: {}",
            task.id,
            task.status.text().unwrap_or("no details")
        ),
        state => bail!("Task {} ended in state {}", task.id, state),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(args(&[
            "--url",
            "http://x:9",
            "--skill",
            "edit_style",
            "make",
            "it",
            "nice",
        ]))
        .unwrap();
        assert_eq!(parsed.url, "http://x:9");
        assert_eq!(parsed.skill, Some(Skill::EditStyle));
        assert_eq!(parsed.text.as_deref(), Some("make it nice"));

        let defaults = parse_args(args(&[])).unwrap();
        assert_eq!(defaults.url, DEFAULT_URL);
        assert!(defaults.skill.is_none());
        assert!(defaults.text.is_none());
    }

    #[test]
    fn test_parse_args_rejects_unknown() {
        assert!(parse_args(args(&["--skill", "summarize"])).is_err());
        assert!(parse_args(args(&["--verbose"])).is_err());
        assert!(parse_args(args(&["--url"])).is_err());
    }
}
