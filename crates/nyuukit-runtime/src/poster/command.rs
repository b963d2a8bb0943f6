//! Translate `PosterSettings` plus a file list into a Nyuu argument vector.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use nyuukit_core::{PipelineError, PosterSettings};

use crate::process::CommandSpec;

pub const PASSWORD_MASK: &str = "****";

/// A validated poster invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterCommand {
    program: PathBuf,
    args: Vec<OsString>,
    /// Position of the server password in `args`, if one was given.
    password_index: Option<usize>,
}

impl PosterCommand {
    /// Validate `settings` and build the argument vector.
    ///
    /// Flag order is fixed; optional flags are omitted when their setting is
    /// empty or off. Files are appended last, in the order given.
    pub fn build(settings: &PosterSettings, files: &[PathBuf]) -> Result<Self, PipelineError> {
        let server = &settings.server;
        let posting = &settings.posting;

        if server.host.trim().is_empty() {
            return Err(PipelineError::validation("host", "Server host is required"));
        }
        if posting.group_list().is_empty() {
            return Err(PipelineError::validation(
                "groups",
                "At least one newsgroup is required",
            ));
        }
        if files.is_empty() {
            return Err(PipelineError::validation("files", "No files selected for upload"));
        }
        let program = match &settings.nyuu_path {
            Some(path) if path.exists() => path.clone(),
            _ => {
                return Err(PipelineError::validation(
                    "nyuu_path",
                    "Nyuu executable not found. Run `nyuukit setup` or set nyuu_path to a valid executable.",
                ));
            }
        };

        let mut args = ArgList::default();

        args.pair("-h", server.host.trim());
        args.pair("-P", server.port.to_string());
        args.flag_if(server.ssl, "-S");
        args.flag_if(server.ignore_cert, "--ignore-cert");
        args.pair_nonempty("-u", &server.user);
        let password_index = (!server.password.is_empty()).then(|| args.0.len() + 1);
        args.pair_nonempty("-p", &server.password);
        args.pair("-n", server.connections.to_string());

        args.pair_nonempty("-a", &posting.article_size);
        args.pair_nonempty("-t", &posting.comment);
        args.pair_nonempty("-f", &posting.from);
        args.pair("-g", posting.group_list().join(","));

        let check = &settings.verification;
        if check.enabled {
            args.push(format!("--check-connections={}", check.connections));
            args.pair("--check-tries", check.tries.to_string());
            args.pair("--check-delay", &check.delay);
            args.pair("--check-retry-delay", &check.retry_delay);
            args.pair("--check-post-tries", check.post_tries.to_string());
        }

        let nzb = &settings.nzb;
        args.pair_nonempty("-o", &nzb.output);
        args.flag_if(nzb.overwrite, "-O");
        args.pair_nonempty("--nzb-title", &nzb.title);
        args.pair_nonempty("--nzb-category", &nzb.category);
        args.pair_nonempty("--nzb-tag", &nzb.tag);
        args.pair_nonempty("--nzb-password", &nzb.password);

        let advanced = &settings.advanced;
        if advanced.skip_errors {
            args.pair("-e", "all");
        }
        args.flag_if(advanced.quiet, "-q");
        if advanced.recursive {
            args.pair("-r", "keep");
        }
        for extra in advanced.custom_args.split_whitespace() {
            args.push(extra);
        }

        for file in files {
            args.push(file.as_os_str());
        }

        Ok(Self {
            program,
            args: args.0,
            password_index,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Human-readable command line with the server password masked.
    ///
    /// Arguments containing spaces are double-quoted. Not shell-safe; for
    /// display only.
    pub fn masked(&self) -> String {
        let mut out = quote(&self.program.to_string_lossy());
        for (i, arg) in self.args.iter().enumerate() {
            if Some(i) == self.password_index {
                let _ = write!(out, " {PASSWORD_MASK}");
            } else {
                let _ = write!(out, " {}", quote(&arg.to_string_lossy()));
            }
        }
        out
    }

    pub fn to_spec(&self) -> CommandSpec {
        CommandSpec::new(&self.program).args(&self.args)
    }
}

fn quote(arg: &str) -> String {
    if arg.contains(' ') {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

#[derive(Default)]
struct ArgList(Vec<OsString>);

impl ArgList {
    fn push(&mut self, arg: impl Into<OsString>) {
        self.0.push(arg.into());
    }

    fn pair(&mut self, flag: &str, value: impl Into<OsString>) {
        self.push(flag);
        self.push(value);
    }

    fn pair_nonempty(&mut self, flag: &str, value: &str) {
        if !value.is_empty() {
            self.pair(flag, value);
        }
    }

    fn flag_if(&mut self, on: bool, flag: &str) {
        if on {
            self.push(flag);
        }
    }
}
