// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Interactive application shell.
//!
//! [`App`] wires a scanner into the characterizer, the model manager and
//! the anomaly detector, then drives them from a `$ `-prompt command
//! loop. [`Command`] is the parsed form of one input line; commands can
//! also be fed programmatically through [`App::execute`], which is what
//! the integration tests do.

use crate::anomaly::AnomalyDetector;
use crate::args::Args;
use crate::characterizer::ObjectCharacterizer;
use crate::manager::ModelManager;
use crate::scanner::{self, Error, PointScanner};
use crate::scanner_lidar::ScannerLidar;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::debug;

/// Recognized top-level commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Exit,
    Chrono,
    Define,
    Set,
    Discard,
    Model,
    Info,
    List,
    Analyze,
    Unknown,
}

/// One parsed input line: the command word plus its parameters.
#[derive(Clone, Debug)]
pub struct Command {
    kind: CommandKind,
    params: Vec<String>,
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let mut tokens = input.split_whitespace();
        let kind = match tokens.next() {
            Some("help") => CommandKind::Help,
            Some("exit") => CommandKind::Exit,
            Some("chrono") => CommandKind::Chrono,
            Some("define") => CommandKind::Define,
            Some("set") => CommandKind::Set,
            Some("discard") => CommandKind::Discard,
            Some("model") => CommandKind::Model,
            Some("info") => CommandKind::Info,
            Some("list") => CommandKind::List,
            Some("analyze") => CommandKind::Analyze,
            _ => CommandKind::Unknown,
        };
        Self {
            kind,
            params: tokens.map(String::from).collect(),
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Parameter by position, or "" when absent.
    fn param(&self, i: usize) -> &str {
        self.params.get(i).map(String::as_str).unwrap_or("")
    }
}

/// The interactive application.
pub struct App {
    characterizer: ObjectCharacterizer,
    detector: AnomalyDetector,
    manager: ModelManager,
}

impl App {
    /// Build the application from command line arguments.
    pub fn new(args: &Args) -> Result<Self, Error> {
        let scanner: Box<dyn PointScanner> = match (&args.file, &args.sensor) {
            (Some(path), _) => scanner::open_file(path)?,
            (None, Some(addr)) => Box::new(ScannerLidar::bind(addr)?),
            (None, None) => return Err(Error::Config("no input source given".into())),
        };

        let mut characterizer = ObjectCharacterizer::new(
            scanner,
            args.obj_frame,
            args.back_frame,
            args.min_reflectivity,
            args.back_distance,
        );
        characterizer.set_chrono(args.chrono.characterization());

        Ok(Self {
            characterizer,
            detector: AnomalyDetector::new(args.chrono.anomaly()),
            manager: ModelManager::with_models(&args.model),
        })
    }

    /// Assemble an application from prebuilt parts.
    pub fn from_parts(
        characterizer: ObjectCharacterizer,
        detector: AnomalyDetector,
        manager: ModelManager,
    ) -> Self {
        Self {
            characterizer,
            detector,
            manager,
        }
    }

    pub fn manager(&self) -> &ModelManager {
        &self.manager
    }

    /// Run the interactive command loop until `exit` or end of input.
    pub fn run(&mut self) {
        let stdin = std::io::stdin();
        let mut input = String::new();
        loop {
            print!("$ ");
            let _ = std::io::stdout().flush();

            input.clear();
            match stdin.lock().read_line(&mut input) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            if input.trim().is_empty() {
                continue;
            }

            debug!("read command: {}", input.trim());
            if !self.execute(&Command::parse(&input)) {
                break;
            }
        }
    }

    /// Execute one command. Returns false when the application should
    /// exit.
    pub fn execute(&mut self, command: &Command) -> bool {
        match command.kind() {
            CommandKind::Help => print_help(Command::parse(command.param(0)).kind()),

            CommandKind::Exit => return false,

            CommandKind::Chrono => self.cmd_chrono(command),

            CommandKind::Define => self.cmd_define(command),

            CommandKind::Set => self.cmd_set(command),

            CommandKind::Discard => self.cmd_discard(command),

            CommandKind::Model => self.cmd_model(command),

            CommandKind::Info => self.cmd_info(),

            CommandKind::List => self.cmd_list(command),

            CommandKind::Analyze => self.cmd_analyze(command),

            CommandKind::Unknown => unknown_command("[command]"),
        }
        true
    }

    fn cmd_chrono(&mut self, command: &Command) {
        let enable = match command.param(0) {
            "set" => true,
            "unset" => false,
            _ => return unknown_command("chrono"),
        };
        if command.params().len() != 2 {
            return unknown_command("chrono");
        }
        match command.param(1) {
            "define" => self.characterizer.set_chrono(enable),
            "analyze" => self.detector.set_chrono(enable),
            "all" => {
                self.characterizer.set_chrono(enable);
                self.detector.set_chrono(enable);
            }
            _ => unknown_command("chrono"),
        }
    }

    fn cmd_define(&mut self, command: &Command) {
        match command.param(0) {
            "background" => {
                if let Err(e) = self.characterizer.define_background() {
                    debug!("background definition failed: {}", e);
                }
            }
            "object" => match self.characterizer.define_object() {
                Ok(Some(object)) => {
                    let name = if command.params().len() == 2 {
                        Some(command.param(1).to_string())
                    } else {
                        None
                    };
                    match self.manager.new_object(name, object) {
                        Some(name) => println!("Object {name} created"),
                        None => eprintln!("Could not create object"),
                    }
                }
                Ok(None) => eprintln!("Scanned object frame does not contain object points"),
                Err(e) => debug!("object definition failed: {}", e),
            },
            _ => unknown_command("define"),
        }
    }

    fn cmd_set(&mut self, command: &Command) {
        if command.params().len() != 2 {
            return unknown_command("set");
        }
        let value = command.param(1);
        match command.param(0) {
            "backframe" => match value.parse::<u64>() {
                Ok(ms) => {
                    self.characterizer.set_back_frame(ms);
                    println!("New background frame set at {ms} ms");
                }
                Err(_) => eprintln!("Invalid number"),
            },
            "objframe" => match value.parse::<u64>() {
                Ok(ms) => {
                    self.characterizer.set_obj_frame(ms);
                    println!("New object frame set at {ms} ms");
                }
                Err(_) => eprintln!("Invalid number"),
            },
            "backthreshold" => match value.parse::<f64>() {
                Ok(m) => {
                    self.characterizer.set_back_distance(m);
                    println!("New background distance threshold set at {m} m");
                }
                Err(_) => eprintln!("Invalid number"),
            },
            "reflthreshold" => match value.parse::<f64>() {
                Ok(r) => {
                    self.characterizer.set_min_reflectivity(r);
                    println!("New minimum reflectivity set at {r} points");
                }
                Err(_) => eprintln!("Invalid number"),
            },
            _ => unknown_command("set"),
        }
    }

    fn cmd_discard(&mut self, command: &Command) {
        if command.params().len() != 1 {
            return unknown_command("discard");
        }
        match command.param(0).parse::<u64>() {
            Ok(ms) => {
                if let Err(e) = self.characterizer.discard(ms) {
                    debug!("discard failed: {}", e);
                }
            }
            Err(_) => eprintln!("Invalid time"),
        }
    }

    fn cmd_model(&mut self, command: &Command) {
        if command.params().len() != 3 {
            return unknown_command("model");
        }
        let (a, b) = (command.param(1).to_string(), command.param(2).to_string());
        match command.param(0) {
            "save" => {
                if self.manager.new_model(&a, &b) {
                    println!("Saved {a} as model {b}");
                } else {
                    eprintln!("Could not save {a} as model {b}");
                }
            }
            "write" => match self.manager.write_model(&a, Path::new(&b)) {
                Ok(()) => println!("Model {a} written into file {b}"),
                Err(e) => {
                    debug!("model write failed: {}", e);
                    eprintln!("Could not write model {a} into file {b}");
                }
            },
            "load" => match self.manager.load_model(Path::new(&b), &a) {
                Ok(()) => println!("Model {a} loaded from file {b}"),
                Err(e) => {
                    debug!("model load failed: {}", e);
                    eprintln!("Could not load model {a} from file {b}");
                }
            },
            _ => unknown_command("model"),
        }
    }

    fn cmd_info(&self) {
        println!(
            "Object frame:            {} ms",
            self.characterizer.obj_frame_ms()
        );
        println!(
            "Background frame:        {} ms",
            self.characterizer.back_frame_ms()
        );
        println!(
            "Background threshold:    {:.2} m",
            self.characterizer.back_distance()
        );
        println!(
            "Reflectivity threshold:  {:.2} points",
            self.characterizer.min_reflectivity()
        );
        println!(
            "define chronometer:      {}",
            activation(self.characterizer.is_chrono())
        );
        println!(
            "analyze chronometer:     {}",
            activation(self.detector.is_chrono())
        );
    }

    fn cmd_list(&self, command: &Command) {
        match command.param(0) {
            "objects" => {
                let mut names = self.manager.object_names().peekable();
                if names.peek().is_some() {
                    println!("Defined objects list:");
                    for name in names {
                        println!("  {name}");
                    }
                } else {
                    println!("No objects were created yet");
                }
            }
            "models" => {
                let mut names = self.manager.model_names().peekable();
                if names.peek().is_some() {
                    println!("Models list:");
                    for name in names {
                        println!("  {name}");
                    }
                } else {
                    println!("No models were loaded yet");
                }
            }
            _ => unknown_command("list"),
        }
    }

    fn cmd_analyze(&mut self, command: &Command) {
        if command.params().len() != 2 {
            return unknown_command("analyze");
        }
        let (obj_name, model_name) = (command.param(0), command.param(1));

        let object = match self.manager.object(obj_name) {
            Some(object) => object,
            None => return eprintln!("Could not locate object {obj_name}"),
        };
        let model = match self.manager.model(model_name) {
            Some(model) => model,
            None => return eprintln!("Could not locate model {model_name}"),
        };

        let report = self.detector.compare(object, model);
        print!("{report}");
    }
}

fn activation(on: bool) -> &'static str {
    if on {
        "Activated"
    } else {
        "Deactivated"
    }
}

fn unknown_command(command: &str) {
    eprintln!("Unknown command: Execute <help {command}> to get info about valid commands");
}

/// Print the help text for one command, or for all of them.
fn print_help(kind: CommandKind) {
    let all = kind == CommandKind::Unknown;

    if all || kind == CommandKind::Help {
        println!("help [command]                 Prints the help text of a command or all of them if not specified");
    }
    if all || kind == CommandKind::Exit {
        println!("exit                           Exits the program");
    }
    if all || kind == CommandKind::Chrono {
        println!("chrono <set|unset> <...>       Activation/Deactivation of specific chronometers:");
        println!("  - define                        Object and background definition routine");
        println!("  - analyze                       Anomaly detection routine");
        println!("  - all                           All of the above");
    }
    if all || kind == CommandKind::Define {
        println!("define <...>                   Definition and characterization of objects and background:");
        println!("  - background                    Defines the background");
        println!("  - object [name]                 Defines an object with a specified name or an automatic generated one");
    }
    if all || kind == CommandKind::Set {
        println!("set <...>                      Modification of current execution parameters:");
        println!("  - backframe <ms>                Milliseconds (integer) to scan for background points");
        println!("  - objframe <ms>                 Milliseconds (integer) to scan for object points");
        println!("  - backthreshold <m>             Meters (decimal) away an object point must be from the background to not be discarded");
        println!("  - reflthreshold <rf>            Minimum reflectivity (decimal) a point must have to not be discarded");
    }
    if all || kind == CommandKind::Discard {
        println!("discard <ms>                   Discards points for the amount of milliseconds specified");
    }
    if all || kind == CommandKind::Model {
        println!("model <...>                    Management of models:");
        println!("  - save <obj> <new_model>        Saves an object as a new model with the given name");
        println!("  - load <new_model> <file>       Loads the contents of a file as a new model with the given name");
        println!("  - write <model> <file>          Writes the given model into a file");
    }
    if all || kind == CommandKind::Info {
        println!("info                           Prints the execution parameters currently in use");
    }
    if all || kind == CommandKind::List {
        println!("list <...>                     List loaded/stored items:");
        println!("  - objects                       Created objects");
        println!("  - models                        Loaded models");
    }
    if all || kind == CommandKind::Analyze {
        println!("analyze <object> <model>       Analyzes the differences between the specified object and model");
    }
}
