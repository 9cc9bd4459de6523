use anyhow::{Context, Result};
use std::cell::Cell;
use std::io::{self, Write};

use crate::agent::Agent;
use crate::agent::tools::ToolRunner;
use crate::model::{DeltaSink, Message};
use crate::model_gateway::ModelGateway;

pub async fn run_repl<G, R>(agent: &mut Agent<G, R>, model: &str) -> Result<()>
where
    G: ModelGateway,
    R: ToolRunner,
{
    println!(
        "Financial Advisor: Hello! I'm here to help you calculate compound interest on your investments."
    );
    println!("model: {model}");
    println!("type 'quit' to exit, '/history' to inspect the conversation, '/reset' to start over");

    loop {
        print!("\nYou: ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read stdin")?;
        if read == 0 {
            break;
        }

        let prompt = input.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("quit") || prompt.eq_ignore_ascii_case("exit") {
            break;
        }
        if prompt.eq_ignore_ascii_case("/reset") {
            agent.reset();
            println!("conversation reset");
            continue;
        }
        if prompt.eq_ignore_ascii_case("/history") {
            print_history(agent.history());
            continue;
        }

        print!("\nFinancial Advisor: ");
        io::stdout().flush().context("Failed to flush stdout")?;
        let sink = StdoutSink::default();
        // A failed turn is reported and the conversation continues.
        match agent.run_turn_streaming(prompt, &sink).await {
            Ok(_) if sink.streamed.get() => println!(),
            Ok(answer) => println!("{}", answer.trim()),
            Err(err) => {
                println!();
                eprintln!("error: {err:#}");
            }
        }
    }

    println!("\nFinancial Advisor: Goodbye! Have a great day!");
    Ok(())
}

/// Writes streamed reply text straight to the terminal.
#[derive(Default)]
struct StdoutSink {
    streamed: Cell<bool>,
}

impl DeltaSink for StdoutSink {
    fn push(&self, delta: &str) {
        let mut stdout = io::stdout().lock();
        // Terminal write failures only lose display text; the turn result still arrives.
        let _ = stdout.write_all(delta.as_bytes());
        let _ = stdout.flush();
        self.streamed.set(true);
    }
}

fn print_history(history: &[Message]) {
    if history.is_empty() {
        println!("(history is empty)");
        return;
    }

    for (idx, msg) in history.iter().enumerate() {
        println!("[{}] {}: {}", idx, msg.role.as_str(), msg.content);
        for call in &msg.tool_calls {
            println!("    -> {}({})", call.name, call.arguments);
        }
    }
}
