//! Play-by-play and win-probability normalizers.
//!
//! The summary payload is laid out differently per sport: gridiron sports
//! group plays into drives, baseball into inning halves, and everything else
//! is a flat list. An event with no plays is reported as an error rather
//! than an empty success, since it almost always means a bad event id or an
//! upstream gap.

use serde::Serialize;
use serde_json::Value;

use crate::json::{array, at, is_truthy, or_empty, text_at};
use crate::types::SkillsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayLayout {
    /// NFL, college football.
    Drives,
    /// NBA, WNBA, NHL, college basketball.
    Flat,
    /// MLB.
    Innings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Play {
    pub id: String,
    pub sequence: Value,
    pub period: Value,
    pub clock: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub home_score: Value,
    pub away_score: Value,
    pub scoring_play: bool,
    pub score_value: Value,
    pub team_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drive {
    pub id: String,
    pub description: String,
    pub team: String,
    pub team_abbreviation: String,
    pub result: String,
    pub is_score: bool,
    pub yards: Value,
    pub offensive_plays: Value,
    pub time_elapsed: String,
    pub start: String,
    pub end: String,
    pub in_progress: bool,
    pub plays: Vec<Play>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InningHalf {
    pub inning: Value,
    pub half: String,
    pub plays: Vec<Play>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlayItem {
    Drive(Drive),
    Inning(InningHalf),
    Play(Play),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayByPlay {
    pub layout: PlayLayout,
    pub items: Vec<PlayItem>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinProbabilityPoint {
    pub play_id: String,
    pub home_pct: Value,
    pub tie_pct: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinProbability {
    pub items: Vec<WinProbabilityPoint>,
    pub count: usize,
}

fn normalize_play(play: &Value) -> Play {
    Play {
        id: text_at(play, &["id"]),
        sequence: or_empty(play, &["sequenceNumber"]),
        period: or_empty(play, &["period", "number"]),
        clock: text_at(play, &["clock", "displayValue"]),
        kind: text_at(play, &["type", "text"]),
        text: text_at(play, &["text"]),
        home_score: or_empty(play, &["homeScore"]),
        away_score: or_empty(play, &["awayScore"]),
        scoring_play: is_truthy(at(play, &["scoringPlay"])),
        score_value: or_empty(play, &["scoreValue"]),
        team_id: text_at(play, &["team", "id"]),
    }
}

fn normalize_drive(drive: &Value, in_progress: bool) -> Drive {
    let plays: Vec<Play> = array(drive, &["plays"]).iter().map(normalize_play).collect();
    Drive {
        id: text_at(drive, &["id"]),
        description: text_at(drive, &["description"]),
        team: text_at(drive, &["team", "displayName"]),
        team_abbreviation: text_at(drive, &["team", "abbreviation"]),
        result: text_at(drive, &["displayResult"]),
        is_score: is_truthy(at(drive, &["isScore"])),
        yards: or_empty(drive, &["yards"]),
        offensive_plays: or_empty(drive, &["offensivePlays"]),
        time_elapsed: text_at(drive, &["timeElapsed", "displayValue"]),
        start: text_at(drive, &["start", "text"]),
        end: text_at(drive, &["end", "text"]),
        in_progress,
        count: plays.len(),
        plays,
    }
}

fn drives(summary: &Value) -> Vec<PlayItem> {
    let mut items: Vec<PlayItem> = array(summary, &["drives", "previous"])
        .iter()
        .map(|d| PlayItem::Drive(normalize_drive(d, false)))
        .collect();

    let current = at(summary, &["drives", "current"]);
    if is_truthy(current) {
        let current = normalize_drive(current, true);
        let duplicate =
            matches!(items.last(), Some(PlayItem::Drive(last)) if last.id == current.id);
        if !duplicate {
            items.push(PlayItem::Drive(current));
        }
    }
    items
}

fn flat(summary: &Value) -> Vec<PlayItem> {
    array(summary, &["plays"])
        .iter()
        .map(|p| PlayItem::Play(normalize_play(p)))
        .collect()
}

/// Consecutive plays with the same inning number and half form one group.
fn innings(summary: &Value) -> Vec<PlayItem> {
    let mut groups: Vec<InningHalf> = Vec::new();
    for play in array(summary, &["plays"]) {
        let inning = or_empty(play, &["period", "number"]);
        let half = text_at(play, &["period", "type"]).to_lowercase();
        match groups.last_mut() {
            Some(g) if g.inning == inning && g.half == half => {
                g.plays.push(normalize_play(play));
                g.count += 1;
            }
            _ => groups.push(InningHalf {
                inning,
                half,
                plays: vec![normalize_play(play)],
                count: 1,
            }),
        }
    }
    groups.into_iter().map(PlayItem::Inning).collect()
}

/// Normalize a game summary's plays. `limit` keeps only the most recent
/// `limit` items (drives, inning halves or plays).
pub fn normalize_plays(
    layout: PlayLayout,
    summary: &Value,
    limit: Option<usize>,
) -> Result<PlayByPlay, SkillsError> {
    let (layout, mut items) = match layout {
        PlayLayout::Drives => {
            let items = drives(summary);
            // Some college summaries carry plays without drive grouping.
            if items.is_empty() {
                (PlayLayout::Flat, flat(summary))
            } else {
                (PlayLayout::Drives, items)
            }
        }
        PlayLayout::Flat => (PlayLayout::Flat, flat(summary)),
        PlayLayout::Innings => (PlayLayout::Innings, innings(summary)),
    };

    if items.is_empty() {
        return Err(SkillsError::NoData(
            "No play-by-play data available for this event".to_string(),
        ));
    }

    if let Some(limit) = limit {
        if items.len() > limit {
            let excess = items.len() - limit;
            items.drain(..excess);
        }
    }

    Ok(PlayByPlay {
        layout,
        count: items.len(),
        items,
    })
}

pub fn normalize_win_probability(summary: &Value) -> Result<WinProbability, SkillsError> {
    let items: Vec<WinProbabilityPoint> = array(summary, &["winprobability"])
        .iter()
        .map(|p| WinProbabilityPoint {
            play_id: text_at(p, &["playId"]),
            home_pct: or_empty(p, &["homeWinPercentage"]),
            tie_pct: or_empty(p, &["tiePercentage"]),
        })
        .collect();

    if items.is_empty() {
        return Err(SkillsError::NoData(
            "No win probability data available for this event".to_string(),
        ));
    }

    Ok(WinProbability {
        count: items.len(),
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn play(id: u32, period: u32, half: &str) -> Value {
        json!({
            "id": id.to_string(),
            "sequenceNumber": id,
            "period": {"number": period, "type": half},
            "clock": {"displayValue": "5:00"},
            "type": {"text": "Play"},
            "text": format!("play {id}"),
            "homeScore": 0,
            "awayScore": 0
        })
    }

    #[test]
    fn test_empty_summary_is_error_for_every_layout() {
        for layout in [PlayLayout::Drives, PlayLayout::Flat, PlayLayout::Innings] {
            let err = normalize_plays(layout, &json!({}), None).unwrap_err();
            assert!(matches!(err, SkillsError::NoData(_)));
        }
    }

    #[test]
    fn test_drives_include_current_once() {
        let summary = json!({"drives": {
            "previous": [
                {"id": "1", "displayResult": "Punt", "plays": [play(1, 1, "")]},
                {"id": "2", "displayResult": "Touchdown", "isScore": true,
                 "plays": [play(2, 1, ""), play(3, 1, "")]}
            ],
            "current": {"id": "3", "plays": [play(4, 2, "")]}
        }});
        let pbp = normalize_plays(PlayLayout::Drives, &summary, None).unwrap();
        assert_eq!(pbp.layout, PlayLayout::Drives);
        assert_eq!(pbp.count, 3);
        match &pbp.items[1] {
            PlayItem::Drive(d) => {
                assert!(d.is_score);
                assert_eq!(d.count, 2);
            }
            other => panic!("expected drive, got {other:?}"),
        }
        match &pbp.items[2] {
            PlayItem::Drive(d) => assert!(d.in_progress),
            other => panic!("expected drive, got {other:?}"),
        }

        let dup = json!({"drives": {
            "previous": [{"id": "7", "plays": []}],
            "current": {"id": "7", "plays": []}
        }});
        assert_eq!(normalize_plays(PlayLayout::Drives, &dup, None).unwrap().count, 1);
    }

    #[test]
    fn test_drives_fall_back_to_flat_plays() {
        let summary = json!({"plays": [play(1, 1, ""), play(2, 1, "")]});
        let pbp = normalize_plays(PlayLayout::Drives, &summary, None).unwrap();
        assert_eq!(pbp.layout, PlayLayout::Flat);
        assert_eq!(pbp.count, 2);
    }

    #[test]
    fn test_flat_limit_keeps_latest() {
        let plays: Vec<Value> = (1..=10).map(|i| play(i, 1, "")).collect();
        let summary = json!({ "plays": plays });
        let pbp = normalize_plays(PlayLayout::Flat, &summary, Some(3)).unwrap();
        assert_eq!(pbp.count, 3);
        let ids: Vec<&str> = pbp
            .items
            .iter()
            .map(|i| match i {
                PlayItem::Play(p) => p.id.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(ids, vec!["8", "9", "10"]);
    }

    #[test]
    fn test_innings_group_by_half() {
        let summary = json!({"plays": [
            play(1, 1, "Top"), play(2, 1, "Top"),
            play(3, 1, "Bottom"),
            play(4, 2, "Top")
        ]});
        let pbp = normalize_plays(PlayLayout::Innings, &summary, None).unwrap();
        assert_eq!(pbp.count, 3);
        match &pbp.items[0] {
            PlayItem::Inning(g) => {
                assert_eq!(g.half, "top");
                assert_eq!(g.inning, json!(1));
                assert_eq!(g.count, 2);
            }
            other => panic!("expected inning, got {other:?}"),
        }
        let v = serde_json::to_value(&pbp).unwrap();
        assert_eq!(v["layout"], json!("innings"));
        assert_eq!(v["items"][1]["half"], json!("bottom"));
    }

    #[test]
    fn test_win_probability() {
        let summary = json!({"winprobability": [
            {"playId": "401", "homeWinPercentage": 0.55, "tiePercentage": 0.0},
            {"playId": "402", "homeWinPercentage": 0.61}
        ]});
        let wp = normalize_win_probability(&summary).unwrap();
        assert_eq!(wp.count, 2);
        assert_eq!(wp.items[0].home_pct, json!(0.55));
        assert_eq!(wp.items[1].tie_pct, json!(""));
        assert!(normalize_win_probability(&json!({})).is_err());
    }
}
