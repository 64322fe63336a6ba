use serde::Deserialize;

use super::{sigmoid, ModelError, SparseVector};

/// Decision threshold on the positive-class probability.
const DECISION_THRESHOLD: f64 = 0.5;

/// Binary classifier over TF-IDF rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    Logistic {
        coef: Vec<f64>,
        intercept: f64,
    },
    TreeEnsemble {
        #[serde(default)]
        base_margin: f64,
        trees: Vec<Tree>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        #[serde(default)]
        missing: Option<usize>,
    },
    Leaf {
        value: f64,
    },
}

impl ClassifierModel {
    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        match self {
            ClassifierModel::Logistic { coef, intercept } => {
                if coef.len() != n_features {
                    return Err(ModelError::invalid(
                        "classifier",
                        format!("{} coefficients for {} features", coef.len(), n_features),
                    ));
                }
                if !intercept.is_finite() || coef.iter().any(|c| !c.is_finite()) {
                    return Err(ModelError::invalid("classifier", "non-finite weights"));
                }
            }
            ClassifierModel::TreeEnsemble { base_margin, trees } => {
                if !base_margin.is_finite() {
                    return Err(ModelError::invalid("classifier", "non-finite base_margin"));
                }
                if trees.is_empty() {
                    return Err(ModelError::invalid("classifier", "ensemble has no trees"));
                }
                for (index, tree) in trees.iter().enumerate() {
                    tree.validate(n_features).map_err(|reason| {
                        ModelError::invalid("classifier", format!("tree {index}: {reason}"))
                    })?;
                }
            }
        }
        Ok(())
    }

    pub fn margin(&self, x: &SparseVector) -> f64 {
        match self {
            ClassifierModel::Logistic { coef, intercept } => {
                intercept + x.iter().map(|(i, v)| coef[*i] * v).sum::<f64>()
            }
            ClassifierModel::TreeEnsemble { base_margin, trees } => {
                base_margin + trees.iter().map(|tree| tree.leaf_value(x)).sum::<f64>()
            }
        }
    }

    /// Probability of class index 1.
    pub fn predict_proba(&self, x: &SparseVector) -> f64 {
        sigmoid(self.margin(x))
    }

    pub fn predict(&self, x: &SparseVector) -> usize {
        usize::from(self.predict_proba(x) > DECISION_THRESHOLD)
    }
}

impl Tree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {index} splits on unknown feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {index} has non-finite threshold"));
                    }
                    // Children must point forward so evaluation always terminates.
                    for child in [Some(*yes), Some(*no), *missing].into_iter().flatten() {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("node {index} has invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {index} has non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, x: &SparseVector) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    index = match x.get(*feature) {
                        Some(value) if value < *threshold => *yes,
                        Some(_) => *no,
                        None => missing.unwrap_or(*no),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(entries: &[(usize, f64)]) -> SparseVector {
        SparseVector::from_sorted(entries.to_vec())
    }

    #[test]
    fn logistic_thresholds_at_half() {
        let model: ClassifierModel = serde_json::from_value(json!({
            "kind": "logistic",
            "coef": [2.0, -2.0],
            "intercept": 0.0
        }))
        .unwrap();
        model.validate(2).unwrap();

        assert_eq!(model.predict(&row(&[(0, 1.0)])), 1);
        assert_eq!(model.predict(&row(&[(1, 1.0)])), 0);
        // Exactly 0.5 is not above the threshold.
        assert_eq!(model.predict(&row(&[])), 0);
        assert!((model.predict_proba(&row(&[])) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn tree_ensemble_routes_missing_features() {
        let model: ClassifierModel = serde_json::from_value(json!({
            "kind": "tree_ensemble",
            "base_margin": -0.5,
            "trees": [{
                "nodes": [
                    {"split": {"feature": 0, "threshold": 0.3, "yes": 1, "no": 2, "missing": 1}},
                    {"leaf": {"value": -1.0}},
                    {"leaf": {"value": 2.0}}
                ]
            }]
        }))
        .unwrap();
        model.validate(1).unwrap();

        assert!((model.margin(&row(&[])) + 1.5).abs() < 1e-12);
        assert!((model.margin(&row(&[(0, 0.1)])) + 1.5).abs() < 1e-12);
        assert!((model.margin(&row(&[(0, 0.9)])) - 1.5).abs() < 1e-12);
        assert_eq!(model.predict(&row(&[(0, 0.9)])), 1);
    }

    #[test]
    fn rejects_backward_tree_edges() {
        let model: ClassifierModel = serde_json::from_value(json!({
            "kind": "tree_ensemble",
            "trees": [{
                "nodes": [
                    {"split": {"feature": 0, "threshold": 0.3, "yes": 0, "no": 1}},
                    {"leaf": {"value": 1.0}}
                ]
            }]
        }))
        .unwrap();
        assert!(model.validate(1).is_err());
    }

    #[test]
    fn rejects_coefficient_count_mismatch() {
        let model = ClassifierModel::Logistic {
            coef: vec![1.0],
            intercept: 0.0,
        };
        assert!(model.validate(3).is_err());
    }
}
