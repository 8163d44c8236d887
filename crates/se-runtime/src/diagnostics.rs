use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Engine, ImmutableString, NativeCallContext, Position};
use se_core::{Diagnostic, LogMode, Severity};

use crate::helpers::rhai_bridge::location_from_position;

pub(crate) type SharedDiagnosticLog = Rc<RefCell<DiagnosticLog>>;

/// Immediate mode forwards to `tracing` under the `script` target; retained
/// mode buffers errors and warnings only.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    mode: LogMode,
    retained: String,
    active_section: String,
}

impl DiagnosticLog {
    pub fn new(mode: LogMode) -> Self {
        Self {
            mode,
            retained: String::new(),
            active_section: String::new(),
        }
    }

    pub fn mode(&self) -> LogMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LogMode) {
        self.mode = mode;
    }

    pub fn messages(&self) -> &str {
        &self.retained
    }

    pub fn clear(&mut self) {
        self.retained.clear();
    }

    pub fn log(&mut self, diagnostic: &Diagnostic) {
        match self.mode {
            LogMode::Immediate => match diagnostic.severity {
                Severity::Error => tracing::error!(target: "script", "{}", diagnostic),
                Severity::Warning => tracing::warn!(target: "script", "{}", diagnostic),
                Severity::Information => tracing::info!(target: "script", "{}", diagnostic),
            },
            LogMode::Retained => {
                if diagnostic.severity.is_retained() {
                    self.retained.push_str(&diagnostic.to_string());
                    self.retained.push('\n');
                }
            }
        }
    }

    pub(crate) fn active_section(&self) -> &str {
        &self.active_section
    }

    pub(crate) fn swap_section(&mut self, section: String) -> String {
        std::mem::replace(&mut self.active_section, section)
    }
}

pub(crate) fn install_diagnostic_callbacks(engine: &mut Engine, log: &SharedDiagnosticLog) {
    let print_log = Rc::clone(log);
    engine.on_print(move |text| {
        let mut log = print_log.borrow_mut();
        let diagnostic = Diagnostic::new(
            log.active_section().to_string(),
            0,
            0,
            Severity::Information,
            text,
        );
        log.log(&diagnostic);
    });

    let debug_log = Rc::clone(log);
    engine.on_debug(move |text, source, position| {
        let mut log = debug_log.borrow_mut();
        let diagnostic = debug_diagnostic(log.active_section(), text, source, position);
        log.log(&diagnostic);
    });

    let warn_log = Rc::clone(log);
    engine.register_fn(
        "warn",
        move |context: NativeCallContext, message: ImmutableString| {
            let mut log = warn_log.borrow_mut();
            let section = context
                .source()
                .map(|source| source.to_string())
                .unwrap_or_else(|| log.active_section().to_string());
            let diagnostic = Diagnostic::new(section, 0, 0, Severity::Warning, message.as_str())
                .at(location_from_position(context.position()));
            log.log(&diagnostic);
        },
    );
}

fn debug_diagnostic(
    active_section: &str,
    text: &str,
    source: Option<&str>,
    position: Position,
) -> Diagnostic {
    let section = source.unwrap_or(active_section);
    Diagnostic::new(section, 0, 0, Severity::Information, text)
        .at(location_from_position(position))
}
