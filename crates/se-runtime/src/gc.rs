use std::collections::VecDeque;
use std::rc::Rc;

use crate::module::ScriptModule;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStatistics {
    pub current_size: usize,
    pub total_detected: u64,
    pub total_destroyed: u64,
}

/// Tracks discarded modules until nothing outside the collector references them.
#[derive(Debug, Default)]
pub struct GarbageCollector {
    candidates: VecDeque<Rc<ScriptModule>>,
    detected: Vec<Rc<ScriptModule>>,
    total_detected: u64,
    total_destroyed: u64,
}

impl GarbageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_candidate(&mut self, module: Rc<ScriptModule>) {
        self.candidates.push_back(module);
    }

    pub fn detect_step(&mut self, budget: usize) -> usize {
        let mut detected = 0;
        for _ in 0..budget.min(self.candidates.len()) {
            let Some(candidate) = self.candidates.pop_front() else {
                break;
            };
            if Rc::strong_count(&candidate) == 1 {
                self.detected.push(candidate);
                detected += 1;
            } else {
                self.candidates.push_back(candidate);
            }
        }
        self.total_detected += detected as u64;
        detected
    }

    pub fn destroy_garbage(&mut self) -> usize {
        let destroyed = self.detected.len();
        self.detected.clear();
        self.total_destroyed += destroyed as u64;
        destroyed
    }

    pub fn full_cycle(&mut self) -> usize {
        self.detect_step(self.candidates.len());
        self.destroy_garbage()
    }

    pub fn statistics(&self) -> GcStatistics {
        GcStatistics {
            current_size: self.candidates.len() + self.detected.len(),
            total_detected: self.total_detected,
            total_destroyed: self.total_destroyed,
        }
    }
}

#[cfg(test)]
mod gc_tests {
    use super::*;
    use crate::module::ModuleRegistry;
    use rhai::Engine;

    fn discarded_module(registry: &mut ModuleRegistry, name: &str) -> Rc<ScriptModule> {
        let ast = Engine::new_raw()
            .compile("fn f() {}")
            .expect("compile should pass");
        registry.insert(name, name, ast);
        registry.discard(name).expect("module should be discarded")
    }

    #[test]
    fn full_cycle_destroys_unreferenced_candidates_only() {
        let mut registry = ModuleRegistry::new();
        let mut collector = GarbageCollector::new();
        let unused = discarded_module(&mut registry, "unused");
        let held = discarded_module(&mut registry, "held");
        collector.add_candidate(unused);
        collector.add_candidate(Rc::clone(&held));

        assert_eq!(collector.full_cycle(), 1);
        let stats = collector.statistics();
        assert_eq!(stats.current_size, 1);
        assert_eq!(stats.total_detected, 1);
        assert_eq!(stats.total_destroyed, 1);

        drop(held);
        assert_eq!(collector.full_cycle(), 1);
        assert_eq!(collector.statistics().current_size, 0);
    }

    #[test]
    fn detect_step_respects_budget_and_keeps_garbage_until_destroyed() {
        let mut registry = ModuleRegistry::new();
        let mut collector = GarbageCollector::new();
        for name in ["a", "b", "c"] {
            collector.add_candidate(discarded_module(&mut registry, name));
        }

        assert_eq!(collector.detect_step(2), 2);
        assert_eq!(collector.statistics().current_size, 3);
        assert_eq!(collector.destroy_garbage(), 2);
        assert_eq!(collector.statistics().current_size, 1);
        assert_eq!(collector.detect_step(2), 1);
    }

    #[test]
    fn empty_collector_is_a_no_op() {
        let mut collector = GarbageCollector::new();
        assert_eq!(collector.detect_step(8), 0);
        assert_eq!(collector.destroy_garbage(), 0);
        assert_eq!(collector.full_cycle(), 0);
        assert_eq!(collector.statistics(), GcStatistics::default());
    }
}
