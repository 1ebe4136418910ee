use clap::Parser;
use log::{debug, info};
use serde::Serialize;
use std::error::Error;
use std::io::{self, BufRead, Read};
use std::path::Path;
use std::thread;
use std::time::Duration;
use turloop::{
    analyze, parse_symbols, Acceptor, Alphabet, Program, ProgramLoader, ProgramManager,
    Supervisor, SupervisorResult, Tape, TuringMachine,
};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// The program file to execute
    #[clap(short, long)]
    program: Option<String>,

    /// Run a built-in demo program by name
    #[clap(long)]
    demo: Option<String>,

    /// List the built-in demo programs and exit
    #[clap(short, long)]
    list: bool,

    /// Replace the initial tape, e.g. "1, 0, _, 1"
    #[clap(short, long)]
    input: Option<String>,

    /// Read --input as characters of this alphabet, numbered from 0
    #[clap(short, long)]
    alphabet: Option<String>,

    /// Print each step of the execution
    #[clap(short = 'd', long)]
    debug: bool,

    /// Milliseconds to wait between steps
    #[clap(long, default_value_t = 0)]
    delay: u64,

    /// Wait for Enter before each step
    #[clap(long)]
    interactive: bool,

    /// Give up after this many steps
    #[clap(short, long)]
    max_steps: Option<u64>,

    /// Print the outcome as JSON
    #[clap(long)]
    json: bool,

    /// Enable debug logging
    #[clap(short, long)]
    verbose: bool,
}

/// Outcome of a supervised run.
#[derive(Serialize)]
struct RunReport {
    name: String,
    result: SupervisorResult,
    steps: u64,
    final_state: Option<String>,
    accepted: Option<bool>,
    tape: String,
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    if cli.list {
        list_programs();
        return Ok(());
    }

    let alphabet = cli.alphabet.as_deref().map(Alphabet::from_chars);
    let mut program = load_program(cli)?;
    info!("Loaded program '{}'", program.name);

    if let Some(input) = &cli.input {
        let tape = match &alphabet {
            Some(alphabet) => alphabet.encode(input)?,
            None => parse_symbols(input)?,
        };
        program = program.with_tape(tape);
        analyze(&program)?;
    }

    let accepting = !program.accepting.is_empty();
    let render = |tape: &Tape| match &alphabet {
        Some(alphabet) => tape.render_with(|value| alphabet.render_symbol(value)),
        None => tape.render(),
    };

    let machine = TuringMachine::from_program(&program)?;
    let mut supervisor = Supervisor::new(Acceptor::new(machine))?;

    let result = loop {
        if cli.debug {
            print_step(supervisor.machine().machine(), &render);
        }

        if cli.max_steps.is_some_and(|max| supervisor.iterations() >= max) {
            debug!("step limit reached");
            break SupervisorResult::Running;
        }

        if cli.interactive {
            wait_for_enter()?;
        } else if cli.delay > 0 {
            thread::sleep(Duration::from_millis(cli.delay));
        }

        let result = supervisor.run_single_iteration()?;
        if result != SupervisorResult::Running {
            break result;
        }
    };

    let acceptor = supervisor.machine();
    let machine = acceptor.machine();
    let report = RunReport {
        name: program.name.clone(),
        result,
        steps: machine.step_count(),
        final_state: machine.current_state().map(|state| state.name().to_string()),
        accepted: accepting.then(|| acceptor.is_input_accepted()),
        tape: machine.tape().map(&render).unwrap_or_default(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Loads a program based on CLI arguments.
///
/// It tries a file path, then a named demo, then stdin, and finally falls back to the first
/// built-in demo.
fn load_program(cli: &Cli) -> Result<Program, Box<dyn Error>> {
    if let Some(file_path) = &cli.program {
        Ok(ProgramLoader::load_program(Path::new(file_path))?)
    } else if let Some(name) = &cli.demo {
        Ok(ProgramManager::get_program_by_name(name)?)
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))?;
        Ok(ProgramLoader::load_program_from_string(&buffer)?)
    } else {
        Ok(ProgramManager::get_program_by_index(0)?)
    }
}

fn list_programs() {
    for index in 0..ProgramManager::get_program_count() {
        if let Ok(info) = ProgramManager::get_program_info(index) {
            println!(
                "{:>2}. {} ({} states, {} rules, capacity {}{})",
                info.index,
                info.name,
                info.state_count,
                info.transition_count,
                info.capacity,
                if info.accepting { ", acceptor" } else { "" }
            );
        }
    }
}

fn print_step<F>(machine: &TuringMachine, render: F)
where
    F: Fn(&Tape) -> String,
{
    let state = machine
        .current_state()
        .map(|state| state.to_string())
        .unwrap_or_else(|| "-".to_string());
    let tape = machine.tape().map(render).unwrap_or_default();

    println!("Step: {}, State: {}, {}", machine.step_count(), state, tape);
}

fn print_report(report: &RunReport) {
    println!("Program: {}", report.name);
    println!("Result: {}", report.result);
    println!("Steps: {}", report.steps);
    if let Some(state) = &report.final_state {
        println!("Final state: {}", state);
    }
    if let Some(accepted) = report.accepted {
        println!("Accepted: {}", if accepted { "yes" } else { "no" });
    }
    println!("Tape: {}", report.tape);
}

fn wait_for_enter() -> io::Result<()> {
    eprint!("Press Enter to step...");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
