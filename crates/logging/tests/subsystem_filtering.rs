//! Integration tests for per-subsystem filtering through the exported macros.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use logging::{Subsystem, VerbosityConfig, trace_exec, trace_match, trace_plan};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().expect("lock").clone()).expect("utf8")
    }
}

fn capture(config: VerbosityConfig, emit: impl FnOnce()) -> String {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_writer(move || writer.clone())
        .with_target(true)
        .without_time()
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, emit);
    buf.contents()
}

#[test]
fn level_zero_hides_informational_events() {
    let output = capture(VerbosityConfig::from_verbose_level(0), || {
        trace_exec!("executing keep");
        trace_plan!("planned 3 commands");
    });
    assert!(output.is_empty(), "unexpected output: {output}");
}

#[test]
fn level_one_shows_exec_but_not_plan_debug() {
    let output = capture(VerbosityConfig::from_verbose_level(1), || {
        trace_exec!("executing keep");
        trace_plan!("planned 3 commands");
    });
    assert!(output.contains("dirsync::exec"));
    assert!(output.contains("executing keep"));
    assert!(!output.contains("planned 3 commands"));
}

#[test]
fn per_subsystem_override_enables_matcher_trace() {
    let config = VerbosityConfig::from_verbose_level(0).with_level(Subsystem::Match, 3);
    let output = capture(config, || {
        trace_match!(offset = 42_u64, "weak hit");
        trace_exec!("executing keep");
    });
    assert!(output.contains("weak hit"));
    assert!(output.contains("offset=42"));
    assert!(!output.contains("executing keep"));
}
