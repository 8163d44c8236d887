use tracing::{debug, debug_span, warn};

use super::lifecycle::ScriptEngine;

impl ScriptEngine {
    // An incremental pass examines at most `gc_step_size` candidates.
    pub fn garbage_collect(&mut self, full_cycle: bool) {
        let _span = debug_span!("script_garbage_collect", full_cycle).entered();
        let step_size = self.config().gc_step_size;

        self.immediate_context.unprepare();
        let busy = self.contexts.unprepare_used();
        if busy > 0 {
            warn!(busy, "Contexts still executing were left prepared");
        }

        let destroyed = if full_cycle {
            self.collector.full_cycle()
        } else {
            self.collector.detect_step(step_size);
            self.collector.destroy_garbage()
        };
        self.contexts.reset_highest_nesting_level();
        debug!(
            destroyed,
            pending = self.collector.statistics().current_size,
            "Garbage collection finished"
        );
    }
}
