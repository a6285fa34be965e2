use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use arbor_ns::{EntryKind, Metadata, Namespace, NamespaceError};
use colored::Colorize;
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let out = Output(cli.format);
    let repo = cli.repo;
    let open = || -> anyhow::Result<Namespace> {
        debug!(repo = %repo.display(), "opening repository");
        Namespace::open_dir(&repo)
            .with_context(|| format!("cannot open repository at {}", repo.display()))
    };

    match cli.command {
        Command::Init(args) => cmd_init(&args.path.unwrap_or_else(|| repo.clone()), out),
        Command::Stat(args) => cmd_stat(&open()?, &args.path, out),
        Command::Ls(args) => cmd_ls(&open()?, args, out),
        Command::Cat(args) => cmd_cat(&open()?, args, out),
        Command::Write(args) => cmd_write(&open()?, args, out),
        Command::Touch(args) => {
            open()?.create_file(&args.path)?;
            out.done("created", &args.path)
        }
        Command::Mkdir(args) => cmd_mkdir(&open()?, args, out),
        Command::Truncate(args) => {
            open()?.truncate(&args.path, args.len)?;
            out.emit(
                json!({ "path": args.path, "len": args.len }),
                format!("{} Truncated {} to {} bytes", "✓".green(), args.path.bold(), args.len),
            )
        }
        Command::Rm(args) => {
            open()?.unlink(&args.path)?;
            out.done("removed", &args.path)
        }
        Command::Rmdir(args) => {
            open()?.rmdir(&args.path)?;
            out.done("removed", &args.path)
        }
        Command::Root => {
            let root = open()?.root_id()?;
            out.emit(json!({ "root": root.to_hex() }), root.to_hex())
        }
    }
}

#[derive(Clone, Copy)]
struct Output(OutputFormat);

impl Output {
    fn emit(self, value: Value, text: String) -> anyhow::Result<()> {
        match self.0 {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
            OutputFormat::Text => println!("{text}"),
        }
        Ok(())
    }

    fn done(self, action: &str, path: &str) -> anyhow::Result<()> {
        self.emit(
            json!({ "path": path, "action": action }),
            format!("{} {} {}", "✓".green(), capitalize(action), path.bold()),
        )
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn child_path(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

fn metadata_json(path: &str, meta: &Metadata) -> Value {
    json!({
        "path": path,
        "kind": meta.kind.to_string(),
        "size": meta.size,
        "object_id": meta.object_id.to_hex(),
    })
}

fn cmd_init(dir: &Path, out: Output) -> anyhow::Result<()> {
    let ns = Namespace::init_dir(dir)
        .with_context(|| format!("cannot initialize repository at {}", dir.display()))?;
    let root = ns.root_id()?;
    out.emit(
        json!({ "path": dir.display().to_string(), "root": root.to_hex() }),
        format!(
            "{} Initialized arborfs repository in {}\n  Root: {}",
            "✓".green().bold(),
            dir.display().to_string().bold(),
            root.short_hex().cyan()
        ),
    )
}

fn cmd_stat(ns: &Namespace, path: &str, out: Output) -> anyhow::Result<()> {
    let meta = ns.stat(path)?;
    let kind = match meta.kind {
        EntryKind::Tree => "directory".blue(),
        EntryKind::Blob => "file".normal(),
    };
    out.emit(
        metadata_json(path, &meta),
        format!(
            "{}: {} ({} bytes)\n  Object: {}",
            path.bold(),
            kind,
            meta.size,
            meta.object_id.to_hex().dimmed()
        ),
    )
}

fn cmd_ls(ns: &Namespace, args: LsArgs, out: Output) -> anyhow::Result<()> {
    // One snapshot so a long listing matches the names it lists.
    let snap = ns.snapshot()?;
    let names = snap.list_entries(&args.path)?;

    let mut rows = Vec::with_capacity(names.len());
    for name in &names {
        let meta = snap.stat(&child_path(&args.path, name))?;
        rows.push((name, meta));
    }

    let value = Value::Array(
        rows.iter()
            .map(|(name, meta)| metadata_json(name, meta))
            .collect(),
    );
    let text = rows
        .iter()
        .map(|(name, meta)| {
            let shown = if meta.is_dir() {
                format!("{name}/").blue().bold().to_string()
            } else {
                name.to_string()
            };
            if args.long {
                let kind = if meta.is_dir() { "dir " } else { "file" };
                format!("{kind} {:>10}  {shown}", meta.size)
            } else {
                shown
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    out.emit(value, text)
}

fn cmd_cat(ns: &Namespace, args: CatArgs, out: Output) -> anyhow::Result<()> {
    let data = ns.read_range(&args.path, args.offset, args.size.unwrap_or(u64::MAX))?;
    match out.0 {
        OutputFormat::Json => out.emit(
            json!({
                "path": args.path,
                "offset": args.offset,
                "len": data.len(),
                "data": String::from_utf8_lossy(&data),
            }),
            String::new(),
        ),
        OutputFormat::Text => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn write_payload(args: &WriteArgs) -> anyhow::Result<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.clone().into_bytes());
    }
    if let Some(file) = &args.file {
        return fs::read(file).with_context(|| format!("cannot read {}", file.display()));
    }
    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

fn cmd_write(ns: &Namespace, args: WriteArgs, out: Output) -> anyhow::Result<()> {
    let data = write_payload(&args)?;
    let written = ns.write_data(&args.path, &data, args.offset)?;
    out.emit(
        json!({ "path": args.path, "offset": args.offset, "written": written }),
        format!(
            "{} Wrote {} bytes to {} at offset {}",
            "✓".green(),
            written,
            args.path.bold(),
            args.offset
        ),
    )
}

fn cmd_mkdir(ns: &Namespace, args: MkdirArgs, out: Output) -> anyhow::Result<()> {
    if !args.parents {
        ns.create_directory(&args.path)?;
        return out.done("created", &args.path);
    }

    let mut prefix = String::new();
    for component in args.path.split('/').filter(|c| !c.is_empty()) {
        prefix = child_path(&prefix, component);
        match ns.create_directory(&prefix) {
            Ok(()) => {}
            Err(NamespaceError::AlreadyExists(_)) => {
                if !ns.stat(&prefix)?.is_dir() {
                    return Err(NamespaceError::NotADirectory(prefix).into());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    out.done("created", &args.path)
}
