use std::collections::HashSet;

use log::debug;
use stadium_parking_model::{Proposal, QueryResponse};

use crate::InvalidProposal;

/// The backend's proposals as one list, recommended first, in the order received. Sorting is left
/// to the ranking.
#[derive(Clone, Debug, Default)]
pub struct NormalizedProposals {
    pub proposals: Vec<Proposal>,
    /// Proposals without any last-mile leg
    pub invalid: usize,
    /// Repeats of a parking site already in the list
    pub duplicates: usize,
}

pub fn validate(proposal: &Proposal) -> Result<(), InvalidProposal> {
    if proposal.has_last_mile() {
        Ok(())
    } else {
        Err(InvalidProposal::MissingLastMile(proposal.id()))
    }
}

pub fn normalize(response: QueryResponse) -> NormalizedProposals {
    let mut result = NormalizedProposals::default();
    let mut seen = HashSet::new();

    for proposal in response.recommended.into_iter().chain(response.alternatives) {
        if let Err(err) = validate(&proposal) {
            debug!("Dropping proposal: {err}");
            result.invalid += 1;
            continue;
        }
        // The first occurrence wins, which is the recommended one if it repeats
        if !seen.insert(proposal.id()) {
            result.duplicates += 1;
            continue;
        }
        result.proposals.push(proposal);
    }

    result
}

impl NormalizedProposals {
    pub fn dropped(&self) -> usize {
        self.invalid + self.duplicates
    }
}

#[cfg(test)]
mod tests {
    use stadium_parking_model::ParkingSiteID;

    use super::*;
    use crate::tests::proposal;

    fn ids(normalized: &NormalizedProposals) -> Vec<u32> {
        normalized.proposals.iter().map(|p| p.id().0).collect()
    }

    #[test]
    fn test_recommended_first() {
        let normalized = normalize(QueryResponse {
            recommended: Some(proposal(3, 30, Some(5), None)),
            alternatives: vec![
                proposal(1, 10, Some(5), None),
                proposal(2, 20, None, Some(5)),
            ],
        });
        // Not sorted yet
        assert_eq!(ids(&normalized), vec![3, 1, 2]);
        assert_eq!(normalized.dropped(), 0);
    }

    #[test]
    fn test_drops_invalid_and_duplicates() {
        let normalized = normalize(QueryResponse {
            recommended: Some(proposal(3, 30, Some(5), None)),
            alternatives: vec![
                proposal(4, 10, None, None),
                proposal(3, 5, Some(1), Some(1)),
                proposal(2, 20, None, Some(5)),
            ],
        });
        assert_eq!(ids(&normalized), vec![3, 2]);
        // The recommended copy survives, not the faster duplicate
        assert_eq!(normalized.proposals[0].driving_duration_minutes, 30);
        assert_eq!(normalized.invalid, 1);
        assert_eq!(normalized.duplicates, 1);
        assert_eq!(normalized.dropped(), 2);
    }

    #[test]
    fn test_missing_recommended() {
        let normalized = normalize(QueryResponse {
            recommended: None,
            alternatives: vec![proposal(7, 10, Some(5), None)],
        });
        assert_eq!(ids(&normalized), vec![7]);
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            validate(&proposal(9, 10, None, None)),
            Err(InvalidProposal::MissingLastMile(ParkingSiteID(9)))
        );
        assert!(validate(&proposal(9, 10, None, Some(2))).is_ok());
    }
}
