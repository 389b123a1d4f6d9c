use model_types::SolveStatus;

/// Classify a solved system from its parameter count and Jacobian rank.
pub fn classify_status(param_count: usize, rank: usize) -> SolveStatus {
    match param_count.saturating_sub(rank) {
        0 => SolveStatus::FullyConstrained,
        dof => SolveStatus::UnderConstrained { dof },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_freedom_is_reported() {
        assert_eq!(classify_status(4, 4), SolveStatus::FullyConstrained);
        assert_eq!(classify_status(4, 1), SolveStatus::UnderConstrained { dof: 3 });
    }
}
