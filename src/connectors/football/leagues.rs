//! Soccer competitions and identifier resolution.
//!
//! Competitions are addressed by slug (`premier-league`); seasons by
//! `<slug>-<year>` (`premier-league-2025`). Ids may also carry a
//! `urn:machina:<kind>:` prefix, which is stripped.

/// How an openfootball season folder is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonLayout {
    /// August to May, `2024-25`.
    SplitYear,
    /// Calendar year, `2025`.
    CalendarYear,
}

/// A competition's file in the openfootball archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Archive {
    pub file: &'static str,
    pub layout: SeasonLayout,
}

/// One supported competition and its identifiers at each provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Competition {
    pub slug: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    /// ESPN league path segment (`eng.1`).
    pub espn: &'static str,
    /// Understat league key; only the five big European leagues.
    pub understat: Option<&'static str>,
    /// Covered by the Fantasy Premier League API.
    pub fpl: bool,
    pub transfermarkt: Option<&'static str>,
    pub openfootball: Option<Archive>,
}

impl Competition {
    pub fn sport_path(&self) -> String {
        format!("soccer/{}", self.espn)
    }

    pub fn season_id(&self, year: impl std::fmt::Display) -> String {
        format!("{}-{}", self.slug, year)
    }
}

const fn comp(
    slug: &'static str,
    name: &'static str,
    country: &'static str,
    espn: &'static str,
    understat: Option<&'static str>,
    transfermarkt: Option<&'static str>,
) -> Competition {
    Competition {
        slug,
        name,
        country,
        espn,
        understat,
        fpl: false,
        transfermarkt,
        openfootball: None,
    }
}

const fn split(c: Competition, file: &'static str) -> Competition {
    Competition {
        openfootball: Some(Archive {
            file,
            layout: SeasonLayout::SplitYear,
        }),
        ..c
    }
}

const fn calendar(c: Competition, file: &'static str) -> Competition {
    Competition {
        openfootball: Some(Archive {
            file,
            layout: SeasonLayout::CalendarYear,
        }),
        ..c
    }
}

pub const COMPETITIONS: &[Competition] = &[
    Competition {
        fpl: true,
        ..split(
            comp(
                "premier-league",
                "Premier League",
                "England",
                "eng.1",
                Some("EPL"),
                Some("premier-league"),
            ),
            "en.1",
        )
    },
    split(
        comp("la-liga", "La Liga", "Spain", "esp.1", Some("La_Liga"), Some("laliga")),
        "es.1",
    ),
    split(
        comp(
            "bundesliga",
            "Bundesliga",
            "Germany",
            "ger.1",
            Some("Bundesliga"),
            Some("1-bundesliga"),
        ),
        "de.1",
    ),
    split(
        comp("serie-a", "Serie A", "Italy", "ita.1", Some("Serie_A"), Some("serie-a")),
        "it.1",
    ),
    split(
        comp("ligue-1", "Ligue 1", "France", "fra.1", Some("Ligue_1"), Some("ligue-1")),
        "fr.1",
    ),
    split(
        comp("championship", "Championship", "England", "eng.2", None, Some("championship")),
        "en.2",
    ),
    split(
        comp("eredivisie", "Eredivisie", "Netherlands", "ned.1", None, Some("eredivisie")),
        "nl.1",
    ),
    split(
        comp("primeira-liga", "Primeira Liga", "Portugal", "por.1", None, Some("primeira-liga")),
        "pt.1",
    ),
    calendar(
        comp(
            "serie-a-brazil",
            "Serie A Brazil",
            "Brazil",
            "bra.1",
            None,
            Some("campeonato-brasileiro-serie-a"),
        ),
        "br.1",
    ),
    calendar(
        comp("mls", "MLS", "USA", "usa.1", None, Some("major-league-soccer")),
        "mls",
    ),
    comp("liga-mx", "Liga MX", "Mexico", "mex.1", None, Some("liga-mx")),
    comp(
        "liga-argentina",
        "Liga Profesional Argentina",
        "Argentina",
        "arg.1",
        None,
        Some("superliga"),
    ),
    comp(
        "scottish-premiership",
        "Scottish Premiership",
        "Scotland",
        "sco.1",
        None,
        Some("scottish-premiership"),
    ),
    comp(
        "belgian-pro-league",
        "Belgian Pro League",
        "Belgium",
        "bel.1",
        None,
        Some("jupiler-pro-league"),
    ),
    comp("super-lig", "Turkish Super Lig", "Turkey", "tur.1", None, Some("super-lig")),
    comp("j-league", "J.League", "Japan", "jpn.1", None, Some("j1-league")),
    comp("a-league", "A-League Men", "Australia", "aus.1", None, Some("a-league-men")),
    comp("nwsl", "NWSL", "USA", "usa.nwsl", None, Some("nwsl")),
    comp(
        "wsl",
        "Women's Super League",
        "England",
        "eng.w.1",
        None,
        Some("womens-super-league"),
    ),
    comp("liga-f", "Liga F", "Spain", "esp.w.1", None, Some("liga-f")),
    comp(
        "premiere-ligue-feminine",
        "Premiere Ligue",
        "France",
        "fra.w.1",
        None,
        Some("premiere-ligue"),
    ),
    comp(
        "a-league-women",
        "A-League Women",
        "Australia",
        "aus.w.1",
        None,
        Some("a-league-women"),
    ),
    comp(
        "womens-champions-league",
        "UEFA Women's Champions League",
        "Europe",
        "uefa.wchampions",
        None,
        None,
    ),
    comp("womens-world-cup", "FIFA Women's World Cup", "International", "fifa.wwc", None, None),
    comp("champions-league", "Champions League", "Europe", "uefa.champions", None, None),
    comp("europa-league", "Europa League", "Europe", "uefa.europa", None, None),
    comp("conference-league", "Conference League", "Europe", "uefa.europa.conf", None, None),
    comp("european-championship", "European Championship", "Europe", "uefa.euro", None, None),
    comp(
        "copa-libertadores",
        "Copa Libertadores",
        "South America",
        "conmebol.libertadores",
        None,
        None,
    ),
    comp("world-cup", "FIFA World Cup", "International", "fifa.world", None, None),
];

/// Competition by slug.
pub fn by_slug(slug: &str) -> Option<&'static Competition> {
    COMPETITIONS.iter().find(|c| c.slug == slug)
}

/// Competition by ESPN league path segment.
pub fn by_espn(espn: &str) -> Option<&'static Competition> {
    COMPETITIONS.iter().find(|c| c.espn == espn)
}

/// Strip a `urn:machina:<kind>:` prefix.
pub fn strip_urn<'a>(id: &'a str, kinds: &[&str]) -> &'a str {
    let id = id.trim();
    kinds
        .iter()
        .find_map(|kind| id.strip_prefix(&format!("urn:machina:{kind}:")))
        .unwrap_or(id)
}

/// Competition by slug, urn or ESPN code.
pub fn resolve_competition(id: &str) -> Option<&'static Competition> {
    let id = strip_urn(id, &["competition"]);
    by_slug(id).or_else(|| by_espn(id))
}

/// `(competition, year)` for a `<slug>-<year>` season id.
pub fn resolve_season(season_id: &str) -> Option<(&'static Competition, i32)> {
    let sid = strip_urn(season_id, &["season"]);
    let (slug, year) = sid.rsplit_once('-')?;
    let year: i32 = year.parse().ok()?;
    by_slug(slug).map(|c| (c, year))
}

pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace(['.', '\''], "")
}

// ---------------------------------------------------------------------------
// Fuzzy team names
// ---------------------------------------------------------------------------

const CLUB_TOKENS: &[&str] = &[" fc", " cf", " sc", " ac", "fc ", "sc ", " afc", " ssc"];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("man", "manchester"),
    ("utd", "united"),
    ("spurs", "tottenham"),
    ("wolves", "wolverhampton"),
    ("nottm", "nottingham"),
    ("sheff", "sheffield"),
    ("inter", "internazionale"),
    ("barca", "barcelona"),
    ("psg", "paris"),
    ("gladbach", "monchengladbach"),
];

fn fold_accent(c: char) -> &'static str {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => "a",
        'é' | 'è' | 'ê' => "e",
        'í' | 'ì' => "i",
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => "o",
        'ú' | 'ù' | 'ü' => "u",
        'ñ' => "n",
        'ç' => "c",
        'ß' => "ss",
        _ => "",
    }
}

/// Lowercased, accent-folded name without club suffixes (`FC`, `AFC`, ...).
pub fn normalize_name(name: &str) -> String {
    let mut n = name.to_lowercase().trim().replace('-', " ").replace('.', "");
    for token in CLUB_TOKENS {
        n = n.replace(token, " ");
    }
    let folded: String = n
        .chars()
        .map(|c| match fold_accent(c) {
            "" => c.to_string(),
            ascii => ascii.to_string(),
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn significant_words(n: &str) -> Vec<&str> {
    let mut words: Vec<&str> = n.split_whitespace().filter(|w| w.len() > 2).collect();
    words.sort_unstable();
    words.dedup();
    words
}

fn expand(words: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    for w in words {
        if let Some((_, full)) = ABBREVIATIONS.iter().find(|(abbr, _)| abbr == w) {
            out.push(full.to_string());
        }
    }
    out
}

/// Whether two team (or player) names likely refer to the same entity
/// across providers.
pub fn names_match(a: &str, b: &str) -> bool {
    if a.trim().is_empty() || b.trim().is_empty() {
        return false;
    }
    let (n1, n2) = (normalize_name(a), normalize_name(b));
    if n1 == n2 || n1.contains(&n2) || n2.contains(&n1) {
        return true;
    }
    let (w1, w2) = (significant_words(&n1), significant_words(&n2));
    let min_size = w1.len().min(w2.len());
    if min_size == 0 {
        return false;
    }
    let (e1, e2) = (expand(&w1), expand(&w2));
    let mut overlap: Vec<&String> = e1.iter().filter(|w| e2.contains(w)).collect();
    overlap.sort_unstable();
    overlap.dedup();
    overlap.len() >= min_size
}
