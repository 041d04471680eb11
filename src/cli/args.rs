// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Preset;
use crate::kubernetes::selector::parse_label;

#[derive(Parser, Debug)]
#[command(name = "kube-reflector")]
#[command(author, version, about = "Keep a live local mirror of Kubernetes resources")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file (default: ~/.kube-reflector/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Kubernetes context to use instead of in-cluster config
    #[arg(short, long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Namespace to mirror
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Resource kind, by plural name or alias (e.g. pods, svc, ing)
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Label constraint; repeat for more (e.g. -l component=singleuser-server)
    #[arg(short, long = "label", value_name = "KEY=VALUE", value_parser = parse_label)]
    pub labels: Vec<(String, String)>,

    /// Start from a predefined kind and label set
    #[arg(short, long, value_enum)]
    pub preset: Option<Preset>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Omit column headers in table output
    #[arg(long)]
    pub no_headers: bool,

    /// Also write logs to daily rotated files in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Mirror resources and print every change until the reflector gives up (default)
    Watch,

    /// Print the mirror once after the initial sync and exit
    Snapshot,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}
