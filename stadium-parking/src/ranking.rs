use log::{debug, warn};
use stadium_parking_model::{LastMileMode, Proposal};

/// A proposal in display order, with the durations the order is based on
#[derive(Clone, Debug, PartialEq)]
pub struct RankedProposal {
    pub proposal: Proposal,
    /// 0 is the top recommendation
    pub rank: usize,
    /// Position in the normalized list
    pub original_index: usize,
    pub durations: Durations,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Durations {
    pub driving: u32,
    pub last_mile_mode: LastMileMode,
    pub last_mile: u32,
    pub total: u32,
}

/// Live traffic supersedes the baseline driving time
pub fn effective_driving(proposal: &Proposal) -> u32 {
    proposal
        .traffic_driving_duration_minutes
        .unwrap_or(proposal.driving_duration_minutes)
}

/// The backend's mode if that leg exists, otherwise whichever leg exists, otherwise the faster one.
/// None means the proposal is unusable.
pub fn effective_last_mile(proposal: &Proposal) -> Option<(LastMileMode, u32)> {
    if let Some(mode) = proposal.recommended_mode() {
        if let Some(minutes) = proposal.last_mile_duration(mode) {
            return Some((mode, minutes));
        }
    }

    match (
        proposal.transit_duration_minutes,
        proposal.walking_duration_minutes,
    ) {
        // On a tie, transit wins
        (Some(transit), Some(walking)) => {
            if walking < transit {
                Some((LastMileMode::Walking, walking))
            } else {
                Some((LastMileMode::Transit, transit))
            }
        }
        (Some(transit), None) => Some((LastMileMode::Transit, transit)),
        (None, Some(walking)) => Some((LastMileMode::Walking, walking)),
        (None, None) => None,
    }
}

pub fn durations(proposal: &Proposal) -> Option<Durations> {
    let driving = effective_driving(proposal);
    let (last_mile_mode, last_mile) = effective_last_mile(proposal)?;
    Some(Durations {
        driving,
        last_mile_mode,
        last_mile,
        // Absurd durations sort last instead of wrapping around to the top
        total: driving.saturating_add(last_mile),
    })
}

/// Sorts by computed total, keeping the input order for equal totals. Proposals without any
/// last-mile leg are left out.
pub fn rank(proposals: Vec<Proposal>) -> Vec<RankedProposal> {
    let mut ranked = Vec::new();
    for (original_index, proposal) in proposals.into_iter().enumerate() {
        let Some(durations) = durations(&proposal) else {
            warn!(
                "Proposal for {:?} has no last-mile leg, not ranking it",
                proposal.id()
            );
            continue;
        };
        if let Some(declared) = proposal.total_duration_minutes {
            if declared != durations.total {
                debug!(
                    "{:?} declares a total of {declared} min, but it adds up to {} min",
                    proposal.id(),
                    durations.total
                );
            }
        }
        ranked.push(RankedProposal {
            proposal,
            rank: 0,
            original_index,
            durations,
        });
    }

    // Stable, so ties keep their order
    ranked.sort_by_key(|r| r.durations.total);
    for (rank, r) in ranked.iter_mut().enumerate() {
        r.rank = rank;
    }
    ranked
}

impl RankedProposal {
    pub fn is_top(&self) -> bool {
        self.rank == 0
    }

    /// The backend's total wins for display, even if it disagrees with the computed one
    pub fn display_total(&self) -> u32 {
        self.proposal
            .total_duration_minutes
            .unwrap_or(self.durations.total)
    }
}
