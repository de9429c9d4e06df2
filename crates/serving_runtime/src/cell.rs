//! ModelCell — версионированная ячейка с текущей моделью.
//!
//! Чтение без блокировок (arc-swap): запрос берёт снимок и работает с ним до конца.
//! provenance и handle лежат в одном снимке, поэтому разорванное чтение невозможно.

use std::sync::Arc;

use arc_swap::ArcSwap;
use churn_model::ModelReference;

#[derive(Debug)]
pub struct ModelSnapshot {
    generation: u64,
    reference: ModelReference,
}

impl ModelSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reference(&self) -> &ModelReference {
        &self.reference
    }
}

pub struct ModelCell {
    inner: ArcSwap<ModelSnapshot>,
}

impl ModelCell {
    /// Первая установленная модель получает generation 1.
    pub fn new(reference: ModelReference) -> Self {
        Self {
            inner: ArcSwap::from_pointee(ModelSnapshot {
                generation: 1,
                reference,
            }),
        }
    }

    pub fn load(&self) -> Arc<ModelSnapshot> {
        self.inner.load_full()
    }

    /// Атомарно заменяет модель. Возвращает новый generation.
    pub fn install(&self, reference: ModelReference) -> u64 {
        let previous = self.inner.rcu(|current| ModelSnapshot {
            generation: current.generation + 1,
            reference: reference.clone(),
        });
        previous.generation + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_model::{StaticFallbackModel, STATIC_FALLBACK_PROVENANCE};

    fn registry_reference(version: u32) -> ModelReference {
        ModelReference::new(
            format!("models:/telco_churn_model/{}", version),
            Arc::new(StaticFallbackModel::new()),
        )
        .expect("non-empty provenance")
    }

    #[test]
    fn test_install_bumps_generation() {
        let cell = ModelCell::new(ModelReference::static_fallback());
        assert_eq!(cell.load().generation(), 1);
        assert_eq!(cell.load().reference().provenance(), STATIC_FALLBACK_PROVENANCE);

        assert_eq!(cell.install(registry_reference(2)), 2);
        let snap = cell.load();
        assert_eq!(snap.generation(), 2);
        assert_eq!(snap.reference().provenance(), "models:/telco_churn_model/2");
    }

    #[test]
    fn test_old_snapshot_survives_install() {
        let cell = ModelCell::new(registry_reference(1));
        let held = cell.load();
        cell.install(registry_reference(2));
        assert_eq!(held.reference().provenance(), "models:/telco_churn_model/1");
        assert_eq!(cell.load().reference().provenance(), "models:/telco_churn_model/2");
    }

    #[test]
    fn test_concurrent_installs_keep_generations_unique() {
        let cell = Arc::new(ModelCell::new(registry_reference(0)));
        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || cell.install(registry_reference(i)))
            })
            .collect();
        let mut generations: Vec<u64> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();
        generations.sort_unstable();
        assert_eq!(generations, (2..=9).collect::<Vec<u64>>());
        assert_eq!(cell.load().generation(), 9);
    }
}
