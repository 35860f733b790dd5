//! Emulator startup configuration (`sys.config`).
//!
//! The external LINC config generator turns `TopoConfig.json` into
//! `sys.config`. It only knows about one controller, so the controller list
//! it writes is replaced afterwards with one entry per configured controller.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info};
use regex::{NoExpand, Regex};

use crate::config::ControllerConfig;
use crate::error::{BridgeError, Result};
use crate::utils::{write_atomic, CommandRunner, Invocation};

use super::{SYS_CONFIG_FILE, TOPO_CONFIG_FILE};

static CONTROLLER_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)\[\{"Switch.*$"#).expect("Invalid controller list regex"));

/// Erlang term listing every controller, e.g.
/// `[{"Switch0-Controller","10.0.0.1",6633,tcp}]},`.
pub fn controller_clause(controllers: &[ControllerConfig]) -> String {
    let entries: Vec<String> = controllers
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{{\"Switch{}-Controller\",\"{}\",{},tcp}}", i, c.ip, c.port))
        .collect();
    format!("[{}]}},", entries.join(","))
}

/// Replace every generated controller list in `text`.
pub fn patch_controllers(text: &str, controllers: &[ControllerConfig]) -> String {
    let clause = controller_clause(controllers);
    CONTROLLER_LIST.replace_all(text, NoExpand(&clause)).into_owned()
}

/// Run the config generator in `work_dir` and patch its output.
///
/// `TopoConfig.json` must already be in `work_dir`. Any output from the
/// generator means it failed. Returns the path of the patched `sys.config`.
pub fn generate_sys_config<R: CommandRunner + ?Sized>(
    runner: &R,
    config_gen_dir: &Path,
    work_dir: &Path,
    controllers: &[ControllerConfig],
) -> Result<PathBuf> {
    let first = controllers.first().ok_or_else(|| BridgeError::ConfigurationMissing {
        what: "controller".to_string(),
        hint: "at least one controller address is required".to_string(),
    })?;

    let invocation = Invocation::path(&config_gen_dir.join("config_generator"))
        .arg(TOPO_CONFIG_FILE)
        .arg(config_gen_dir.join("sys.config.template").to_string_lossy())
        .arg(first.ip.as_str())
        .arg(first.port.to_string())
        .current_dir(work_dir);

    info!("Creating sys.config with {}", invocation.program_name());
    let output = runner.run(&invocation)?;
    let output = output.trim();
    if !output.is_empty() {
        return Err(BridgeError::SynthesisFailure { output: output.to_string() });
    }

    let path = work_dir.join(SYS_CONFIG_FILE);
    let text = std::fs::read_to_string(&path).map_err(BridgeError::io(&path))?;
    let patched = patch_controllers(&text, controllers);
    write_atomic(&path, patched.as_bytes())?;
    debug!("Patched controller list for {} controller(s)", controllers.len());

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const GENERATED: &str = r#"[{linc,
  [{of_config,disabled},
   {capable_switch_ports,[{port,1,[{interface,"tap0"}]}]},
   {logical_switches,
    [{switch,1,
      [{backend,linc_us4_oe},
       {controllers,[{"Switch0-Controller","10.0.0.1",6633,tcp}]},
       {ports,[{port,1,{queues,[]}}]}]}]}]}].
"#;

    struct Generator {
        output: &'static str,
        calls: RefCell<Vec<Invocation>>,
    }

    impl CommandRunner for Generator {
        fn run(&self, invocation: &Invocation) -> Result<String> {
            self.calls.borrow_mut().push(invocation.clone());
            if let Some(dir) = &invocation.cwd {
                std::fs::write(dir.join(SYS_CONFIG_FILE), GENERATED).unwrap();
            }
            Ok(self.output.to_string())
        }
    }

    fn controllers() -> Vec<ControllerConfig> {
        vec![ControllerConfig::new("10.0.0.1", 6633), ControllerConfig::new("10.0.0.2", 6653)]
    }

    #[test]
    fn test_controller_clause() {
        assert_eq!(
            controller_clause(&controllers()),
            r#"[{"Switch0-Controller","10.0.0.1",6633,tcp},{"Switch1-Controller","10.0.0.2",6653,tcp}]},"#
        );
    }

    #[test]
    fn test_patch_replaces_to_end_of_line() {
        let patched = patch_controllers(GENERATED, &controllers());
        assert!(patched.contains(
            r#"{controllers,[{"Switch0-Controller","10.0.0.1",6633,tcp},{"Switch1-Controller","10.0.0.2",6653,tcp}]},"#
        ));
        assert!(patched.contains("{ports,[{port,1,{queues,[]}}]}]}]}]}]."));
        assert_eq!(patched.lines().count(), GENERATED.lines().count());
    }

    #[test]
    fn test_generate_invokes_generator_in_work_dir() {
        let gen_dir = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let runner = Generator { output: "", calls: RefCell::new(Vec::new()) };

        let path = generate_sys_config(&runner, gen_dir.path(), work.path(), &controllers()).unwrap();

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program_name(), "config_generator");
        assert_eq!(calls[0].args[0], "TopoConfig.json");
        assert!(calls[0].args[1].ends_with("sys.config.template"));
        assert_eq!(&calls[0].args[2..], ["10.0.0.1", "6633"]);
        assert_eq!(calls[0].cwd.as_deref(), Some(work.path()));

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("Switch1-Controller"));
    }

    #[test]
    fn test_generator_output_is_failure() {
        let gen_dir = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let runner = Generator {
            output: "escript: exception error: no match\n",
            calls: RefCell::new(Vec::new()),
        };

        let err = generate_sys_config(&runner, gen_dir.path(), work.path(), &controllers()).unwrap_err();
        match err {
            BridgeError::SynthesisFailure { output } => assert!(output.starts_with("escript")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_controllers() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Generator { output: "", calls: RefCell::new(Vec::new()) };
        let err = generate_sys_config(&runner, dir.path(), dir.path(), &[]).unwrap_err();
        assert!(matches!(err, BridgeError::ConfigurationMissing { .. }));
        assert!(runner.calls.borrow().is_empty());
    }
}
