//! Point standings.

use serde::Serialize;
use std::cmp::Ordering;
use utoipa::ToSchema;
use uuid::Uuid;

use super::models::User;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Standing {
    pub rank: usize,
    pub user_id: Uuid,
    pub name: String,
    pub major: String,
    pub year: String,
    pub points: i64,
}

fn by_points_then_name(a: &User, b: &User) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| a.last_name.to_lowercase().cmp(&b.last_name.to_lowercase()))
        .then_with(|| a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()))
}

/// Rank members by points; equal totals share a rank (1, 2, 2, 4).
#[must_use]
pub fn standings(mut users: Vec<User>) -> Vec<Standing> {
    users.sort_by(by_points_then_name);

    let mut out = Vec::with_capacity(users.len());
    let mut previous: Option<(i64, usize)> = None;
    for (index, user) in users.into_iter().enumerate() {
        let rank = match previous {
            Some((points, rank)) if points == user.points => rank,
            _ => index + 1,
        };
        previous = Some((user.points, rank));
        out.push(Standing {
            rank,
            user_id: user.id,
            name: user.full_name(),
            major: user.major,
            year: user.year,
            points: user.points,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::models::fixtures::user;

    fn with_points(first: &str, last: &str, points: i64) -> User {
        let mut user = user(first, last);
        user.points = points;
        user
    }

    #[test]
    fn ties_share_rank() {
        let table = standings(vec![
            with_points("Cy", "Ng", 10),
            with_points("Al", "Bo", 30),
            with_points("Di", "Ax", 10),
            with_points("Ed", "Yu", 5),
        ]);
        let ranks: Vec<_> = table.iter().map(|s| (s.name.as_str(), s.rank)).collect();
        assert_eq!(
            ranks,
            vec![("Al Bo", 1), ("Di Ax", 2), ("Cy Ng", 2), ("Ed Yu", 4)]
        );
    }

    #[test]
    fn empty_board() {
        assert!(standings(Vec::new()).is_empty());
    }
}
