use dbforge::runner::Invocation;

/// Wrap a shell snippet as an invocation; tests drive the runner with `sh`
/// the way production drives it with `java`.
pub fn sh(script: &str) -> Invocation {
    Invocation {
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        current_dir: None,
        log_name: None,
    }
}

pub fn sh_logged(script: &str, log_name: &str) -> Invocation {
    Invocation {
        log_name: Some(log_name.to_string()),
        ..sh(script)
    }
}
