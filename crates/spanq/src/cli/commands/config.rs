//! Implementation of `spanq config`.

use std::process::ExitCode;

use spanq_config::ConfigSources;

use crate::cli::context::CommandContext;

/// Shows effective configuration settings, preceded by the files they came from.
pub fn run(ctx: &CommandContext) -> ExitCode {
    match ctx.config.settings_to_toml() {
        Ok(toml) => {
            print!("{}", sources_header(&ctx.config.sources));
            print!("{toml}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize configuration: {e}");
            ExitCode::FAILURE
        }
    }
}

/// TOML comments naming the merged files, highest precedence first.
fn sources_header(sources: &ConfigSources) -> String {
    if sources.is_empty() {
        return "# no configuration files found; showing defaults\n\n".to_string();
    }
    let mut header = String::from("# merged from, highest precedence first:\n");
    for path in sources.files() {
        let marker = if sources.root.as_ref() == Some(&path) {
            " (root)"
        } else if sources.global.as_ref() == Some(&path) {
            " (global)"
        } else {
            ""
        };
        header.push_str(&format!("#   {}{marker}\n", path.display()));
    }
    header.push('\n');
    header
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn header_marks_root_and_global() {
        let sources = ConfigSources {
            project: vec![PathBuf::from("/w/a/.spanq.toml"), PathBuf::from("/w/.spanq.toml")],
            root: Some(PathBuf::from("/w/.spanq.toml")),
            global: None,
        };
        let header = sources_header(&sources);
        assert!(header.contains("#   /w/a/.spanq.toml\n"));
        assert!(header.contains("#   /w/.spanq.toml (root)\n"));

        let sources = ConfigSources {
            global: Some(PathBuf::from("/home/u/.spanq.toml")),
            ..ConfigSources::default()
        };
        assert!(sources_header(&sources).contains("/home/u/.spanq.toml (global)"));
    }

    #[test]
    fn header_without_files_says_defaults() {
        let header = sources_header(&ConfigSources::default());
        assert!(header.starts_with("# no configuration files found"));
    }
}
