//! Cursor Claim Arbitration
//!
//! Competing cursor claims resolve to the highest priority; equal
//! priorities favour the most recently inserted claim, which is why the
//! claim map is insertion-ordered. With no claims the active mode's
//! baseline cursor applies.

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CursorClaim {
    pub cursor: String,
    pub priority: i32,
}

#[derive(Debug, Default)]
pub(crate) struct CursorClaims {
    claims: IndexMap<String, CursorClaim>,
}

impl CursorClaims {
    /// Insert or refresh a claim; re-claiming a token moves it to the back
    /// so equal priorities favour the most recent claim
    pub fn set(&mut self, token: &str, cursor: &str, priority: i32) {
        self.claims.shift_remove(token);
        self.claims.insert(
            token.to_string(),
            CursorClaim {
                cursor: cursor.to_string(),
                priority,
            },
        );
    }

    /// Remove a claim; true if it existed
    pub fn remove(&mut self, token: &str) -> bool {
        self.claims.shift_remove(token).is_some()
    }

    pub fn clear(&mut self) {
        self.claims.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Effective cursor under the current claims
    pub fn resolve(&self, baseline: &str) -> String {
        let mut best: Option<&CursorClaim> = None;
        for claim in self.claims.values() {
            let wins = best.map_or(true, |current| claim.priority >= current.priority);
            if wins {
                best = Some(claim);
            }
        }
        best.map(|claim| claim.cursor.clone())
            .unwrap_or_else(|| baseline.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_priority_wins() {
        let mut claims = CursorClaims::default();
        claims.set("selection", "text", 5);
        claims.set("marquee", "crosshair", 10);

        assert_eq!(claims.resolve("auto"), "crosshair");
    }

    #[test]
    fn test_removal_reverts_to_lower_claim_then_baseline() {
        let mut claims = CursorClaims::default();
        claims.set("selection", "text", 5);
        claims.set("marquee", "crosshair", 10);

        claims.remove("marquee");
        assert_eq!(claims.resolve("auto"), "text");

        claims.remove("selection");
        assert_eq!(claims.resolve("auto"), "auto");
        assert!(claims.is_empty());
    }

    #[test]
    fn test_equal_priority_favours_most_recent() {
        let mut claims = CursorClaims::default();
        claims.set("first", "grab", 5);
        claims.set("second", "pointer", 5);
        assert_eq!(claims.resolve("auto"), "pointer");

        // refreshing an existing claim moves it to the back
        claims.set("first", "grab", 5);
        assert_eq!(claims.resolve("auto"), "grab");
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut claims = CursorClaims::default();
        claims.set("one", "grab", 1);
        claims.clear();
        assert_eq!(claims.resolve("move"), "move");
    }
}
