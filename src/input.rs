//! Plain-text inputs: discrete trajectories and coarse-graining maps.
//!
//! Both formats ignore blank lines and `#` comments.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use msm_cktest::CoarseMap;
use msm_counts::DiscreteTrajectory;

fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(i, line)| {
        let line = line.split('#').next().unwrap_or("").trim();
        (!line.is_empty()).then_some((i + 1, line))
    })
}

/// Parses whitespace-separated state labels; negative values mark missing frames.
pub fn parse_trajectory(text: &str) -> Result<DiscreteTrajectory> {
    let mut states = Vec::new();
    for (line_no, line) in content_lines(text) {
        for token in line.split_whitespace() {
            let state: i32 = token
                .parse()
                .with_context(|| format!("line {line_no}: invalid state label {token:?}"))?;
            states.push(state);
        }
    }
    Ok(DiscreteTrajectory::new(states))
}

/// Reads one trajectory file.
pub fn read_trajectory(path: &Path) -> Result<DiscreteTrajectory> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trajectory: {}", path.display()))?;
    let traj = parse_trajectory(&text)
        .with_context(|| format!("failed to parse trajectory: {}", path.display()))?;
    if traj.is_empty() {
        bail!("trajectory file is empty: {}", path.display());
    }
    Ok(traj)
}

/// Reads every trajectory file, in order.
pub fn read_trajectories(paths: &[impl AsRef<Path>]) -> Result<Vec<DiscreteTrajectory>> {
    paths.iter().map(|p| read_trajectory(p.as_ref())).collect()
}

/// Parses `fine coarse` pairs, one per line. A fine label may appear once.
pub fn parse_coarse_map(text: &str) -> Result<CoarseMap> {
    let mut pairs = BTreeMap::new();
    for (line_no, line) in content_lines(text) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [fine, coarse] = fields.as_slice() else {
            bail!("line {line_no}: expected `fine coarse`, got {line:?}");
        };
        let fine: usize = fine
            .parse()
            .with_context(|| format!("line {line_no}: invalid fine label {fine:?}"))?;
        let coarse: usize = coarse
            .parse()
            .with_context(|| format!("line {line_no}: invalid coarse label {coarse:?}"))?;
        if pairs.insert(fine, coarse).is_some() {
            bail!("line {line_no}: fine state {fine} is mapped twice");
        }
    }
    Ok(CoarseMap::new(pairs))
}

/// Reads a coarse-graining map file.
pub fn read_coarse_map(path: &Path) -> Result<CoarseMap> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read coarse map: {}", path.display()))?;
    parse_coarse_map(&text).with_context(|| format!("failed to parse coarse map: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trajectory_spans_lines_and_skips_comments() {
        let traj = parse_trajectory("# frames\n0 1 1\n\n2 -1 0  # gap\n").unwrap();
        assert_eq!(traj.as_slice(), &[0, 1, 1, 2, -1, 0]);
    }

    #[test]
    fn trajectory_rejects_garbage() {
        let err = parse_trajectory("0 1\n1 x\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn coarse_map_parses_pairs() {
        let map = parse_coarse_map("0 0\n1 0\n# second basin\n2 1\n").unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.coarse_of(1), Some(0));
        assert_eq!(map.coarse_of(2), Some(1));
    }

    #[test]
    fn coarse_map_rejects_bad_lines() {
        assert!(parse_coarse_map("0 0 0\n").is_err());
        assert!(parse_coarse_map("0 -1\n").is_err());
        assert!(parse_coarse_map("0 0\n0 1\n").is_err());
    }

    #[test]
    fn files_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let traj_path = dir.path().join("a.txt");
        std::fs::write(&traj_path, "0 0 1\n1 0\n").unwrap();
        let trajs = read_trajectories(&[&traj_path]).unwrap();
        assert_eq!(trajs[0].len(), 5);

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "# nothing\n").unwrap();
        assert!(read_trajectory(&empty).is_err());
        assert!(read_trajectory(&dir.path().join("missing.txt")).is_err());
    }
}
