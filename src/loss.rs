use std::str::FromStr;

use machine_learning::arch::loss::{CrossEntropy, LossFn, Mse};

use crate::ClassifierErr;

/// The loss functions a classifier can be trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    /// Softmax plus negative log-likelihood of the arg-max target.
    CrossEntropy,
    /// Squared error against the raw label row, summed over the batch.
    Mse,
}

impl LossKind {
    pub fn build(self) -> Box<dyn LossFn> {
        match self {
            LossKind::CrossEntropy => Box::new(CrossEntropy::new()),
            LossKind::Mse => Box::new(Mse::new()),
        }
    }
}

impl FromStr for LossKind {
    type Err = ClassifierErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cross-entropy" | "cross_entropy" => Ok(LossKind::CrossEntropy),
            "mse" => Ok(LossKind::Mse),
            other => Err(ClassifierErr::UnknownLoss(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_identifiers() {
        assert_eq!("cross-entropy".parse::<LossKind>().unwrap(), LossKind::CrossEntropy);
        assert_eq!("mse".parse::<LossKind>().unwrap(), LossKind::Mse);
        assert!(matches!(
            "hinge".parse::<LossKind>(),
            Err(ClassifierErr::UnknownLoss(name)) if name == "hinge"
        ));
    }
}
