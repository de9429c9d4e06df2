//! Вычисление дрейфа — внешний чёрный ящик за трейтом DriftComputation.
//!
//! Встроенная реализация: KS-тест для числовых колонок, расстояние Йенсена–Шеннона
//! для категориальных. Отчёт — JSON вида {"metrics":[{"result":{"drift_share":..}}]}.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Map, Value};

use crate::dataset::Dataset;
use crate::error::DriftError;

pub trait DriftComputation: Send + Sync {
    /// Сырой отчёт. Валидацию делает DriftEvaluator, не реализация.
    fn compute(&self, reference: &Dataset, current: &Dataset) -> Result<Value, DriftError>;
}

#[derive(Debug, Clone)]
pub struct ColumnDriftComputation {
    excluded: BTreeSet<String>,
    ks_p_value: f64,
    js_distance: f64,
}

impl Default for ColumnDriftComputation {
    fn default() -> Self {
        Self {
            excluded: ["customerID".to_string()].into_iter().collect(),
            ks_p_value: 0.05,
            js_distance: 0.1,
        }
    }
}

impl ColumnDriftComputation {
    pub fn new(excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
            ..Self::default()
        }
    }

    fn column_result(&self, reference: &[&str], current: &[&str]) -> Option<Value> {
        if reference.is_empty() || current.is_empty() {
            return None;
        }
        let numeric = parse_all(reference).zip(parse_all(current));
        let result = match numeric {
            Some((mut a, mut b)) => {
                a.sort_by(f64::total_cmp);
                b.sort_by(f64::total_cmp);
                let d = ks_statistic(&a, &b);
                let p = ks_p_value(d, a.len(), b.len());
                json!({
                    "column_type": "num",
                    "stattest": "ks",
                    "statistic": d,
                    "score": p,
                    "threshold": self.ks_p_value,
                    "drift_detected": p < self.ks_p_value,
                })
            }
            None => {
                let distance = jensen_shannon_distance(reference, current);
                json!({
                    "column_type": "cat",
                    "stattest": "jensenshannon",
                    "score": distance,
                    "threshold": self.js_distance,
                    "drift_detected": distance >= self.js_distance,
                })
            }
        };
        Some(result)
    }
}

impl DriftComputation for ColumnDriftComputation {
    fn compute(&self, reference: &Dataset, current: &Dataset) -> Result<Value, DriftError> {
        let mut by_column = Map::new();
        let mut drifted = 0usize;
        for column in reference.columns() {
            if self.excluded.contains(column) {
                continue;
            }
            let result = match self.column_result(&reference.column_values(column), &current.column_values(column)) {
                Some(r) => r,
                None => continue,
            };
            if result["drift_detected"].as_bool() == Some(true) {
                drifted += 1;
            }
            by_column.insert(column.clone(), result);
        }

        let monitored = by_column.len();
        let mut result = json!({
            "number_of_columns": monitored,
            "number_of_drifted_columns": drifted,
            "drift_by_columns": Value::Object(by_column),
        });
        // Нет колонок — нет статистики; отчёт без drift_share отбракует evaluator.
        if monitored > 0 {
            result["drift_share"] = json!(drifted as f64 / monitored as f64);
            result["dataset_drift"] = json!(drifted as f64 / monitored as f64 >= 0.5);
        }
        Ok(json!({
            "metrics": [{ "metric": "DataDriftTable", "result": result }],
            "reference_rows": reference.row_count(),
            "current_rows": current.row_count(),
        }))
    }
}

fn parse_all(values: &[&str]) -> Option<Vec<f64>> {
    values.iter().map(|v| v.parse::<f64>().ok().filter(|x| x.is_finite())).collect()
}

/// Двухвыборочная статистика Колмогорова–Смирнова; входы отсортированы.
fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    d
}

/// Асимптотическое p-value (ряд Колмогорова с поправкой Стивенса).
fn ks_p_value(d: f64, n: usize, m: usize) -> f64 {
    let en = ((n * m) as f64 / (n + m) as f64).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * d;
    let a2 = -2.0 * lambda * lambda;
    let mut sum = 0.0;
    let mut sign = 2.0;
    let mut prev_term = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = sign * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= 1e-3 * prev_term || term.abs() <= 1e-8 * sum {
            return sum.clamp(0.0, 1.0);
        }
        sign = -sign;
        prev_term = term.abs();
    }
    // Ряд не сошёлся — малое lambda, распределения неотличимы.
    1.0
}

fn frequencies<'a>(values: &[&'a str]) -> BTreeMap<&'a str, f64> {
    let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
    for &v in values {
        *counts.entry(v).or_insert(0.0) += 1.0;
    }
    let total = values.len() as f64;
    counts.values_mut().for_each(|c| *c /= total);
    counts
}

/// Расстояние Йенсена–Шеннона (log2, в [0, 1]).
fn jensen_shannon_distance(reference: &[&str], current: &[&str]) -> f64 {
    let p = frequencies(reference);
    let q = frequencies(current);
    let levels: BTreeSet<&str> = p.keys().chain(q.keys()).copied().collect();
    let mut divergence = 0.0;
    for level in levels {
        let pi = p.get(level).copied().unwrap_or(0.0);
        let qi = q.get(level).copied().unwrap_or(0.0);
        let mi = 0.5 * (pi + qi);
        if pi > 0.0 {
            divergence += 0.5 * pi * (pi / mi).log2();
        }
        if qi > 0.0 {
            divergence += 0.5 * qi * (qi / mi).log2();
        }
    }
    divergence.max(0.0).sqrt()
}
