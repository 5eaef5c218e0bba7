// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use lidar_inspect::app::App;
use lidar_inspect::args::Args;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.rust_log)
        .with_writer(std::io::stderr)
        .init();

    let mut app = match App::new(&args) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("lidar-inspect: {e}");
            return ExitCode::FAILURE;
        }
    };

    app.run();
    ExitCode::SUCCESS
}
