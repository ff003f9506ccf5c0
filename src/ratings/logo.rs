use std::path::{Path, PathBuf};

use posterforge_common::{RatingName, RatingSet, RatingType};

use super::{LogoProvider, LogoSpec};

/// Rotten Tomatoes scores below this percentage use the "low" logo.
const LOW_PERCENT: f64 = 60.0;

/// Score with one fractional digit, e.g. `7.84` -> `"7.8"`.
pub fn format_decimal(score: f64) -> String {
    format!("{:.1}", (score * 10.0).round() / 10.0)
}

/// Score as a whole percentage, e.g. `5.95` -> `"60%"`.
pub fn format_percent(score: f64) -> String {
    format!("{}%", (score * 10.0).round() as i64)
}

/// Whether a 0-10 score falls in the Rotten Tomatoes "low" band.
///
/// Uses the unrounded percentage, so `5.95` (59.5%) is low even though it
/// displays as `60%`.
pub fn is_low_score(score: f64) -> bool {
    score * 10.0 < LOW_PERCENT
}

pub struct ImdbLogo {
    dir: PathBuf,
}

impl ImdbLogo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl LogoProvider for ImdbLogo {
    fn logos(&self, ratings: &RatingSet) -> Vec<LogoSpec> {
        ratings
            .get(RatingName::Imdb, RatingType::Audience)
            .map(|r| LogoSpec {
                image_path: self.dir.join("imdb.png"),
                text: format_decimal(r.score),
            })
            .into_iter()
            .collect()
    }
}

pub struct TmdbLogo {
    dir: PathBuf,
}

impl TmdbLogo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl LogoProvider for TmdbLogo {
    fn logos(&self, ratings: &RatingSet) -> Vec<LogoSpec> {
        ratings
            .get(RatingName::Tmdb, RatingType::Audience)
            .map(|r| LogoSpec {
                image_path: self.dir.join("tmdb.png"),
                text: format_decimal(r.score),
            })
            .into_iter()
            .collect()
    }
}

/// Critic and audience badges, each with its own low/normal logo.
pub struct RottenTomatoesLogo {
    dir: PathBuf,
}

impl RottenTomatoesLogo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn logo_path(dir: &Path, kind: &str, low: bool) -> PathBuf {
        let suffix = if low { "-low" } else { "" };
        dir.join(format!("rottentomatoes-{kind}{suffix}.png"))
    }
}

impl LogoProvider for RottenTomatoesLogo {
    fn logos(&self, ratings: &RatingSet) -> Vec<LogoSpec> {
        [(RatingType::Critic, "critic"), (RatingType::Audience, "audience")]
            .into_iter()
            .filter_map(|(rating_type, kind)| {
                let rating = ratings.get(RatingName::RottenTomatoes, rating_type)?;
                Some(LogoSpec {
                    image_path: Self::logo_path(&self.dir, kind, is_low_score(rating.score)),
                    text: format_percent(rating.score),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posterforge_common::Rating;

    fn set(ratings: &[(RatingName, RatingType, f64)]) -> RatingSet {
        ratings
            .iter()
            .map(|&(n, t, s)| Rating::new(n, t, s))
            .collect()
    }

    #[test]
    fn decimal_formatting() {
        assert_eq!(format_decimal(7.84), "7.8");
        assert_eq!(format_decimal(8.0), "8.0");
        assert_eq!(format_decimal(10.0), "10.0");
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(format_percent(5.95), "60%");
        assert_eq!(format_percent(9.4), "94%");
        assert_eq!(format_percent(0.0), "0%");
    }

    #[test]
    fn imdb_badge() {
        let logos = ImdbLogo::new("/logos").logos(&set(&[(RatingName::Imdb, RatingType::Audience, 7.84)]));
        assert_eq!(
            logos,
            vec![LogoSpec {
                image_path: PathBuf::from("/logos/imdb.png"),
                text: "7.8".into(),
            }]
        );
    }

    #[test]
    fn providers_ignore_other_ratings() {
        let ratings = set(&[(RatingName::Imdb, RatingType::Audience, 7.0)]);
        assert!(TmdbLogo::new("/logos").logos(&ratings).is_empty());
        assert!(RottenTomatoesLogo::new("/logos").logos(&ratings).is_empty());
    }

    #[test]
    fn rotten_tomatoes_low_critic_variant() {
        let logos = RottenTomatoesLogo::new("/logos").logos(&set(&[
            (RatingName::RottenTomatoes, RatingType::Critic, 5.95),
            (RatingName::RottenTomatoes, RatingType::Audience, 9.1),
        ]));
        assert_eq!(
            logos,
            vec![
                LogoSpec {
                    image_path: PathBuf::from("/logos/rottentomatoes-critic-low.png"),
                    text: "60%".into(),
                },
                LogoSpec {
                    image_path: PathBuf::from("/logos/rottentomatoes-audience.png"),
                    text: "91%".into(),
                },
            ]
        );
    }

    #[test]
    fn rotten_tomatoes_variants_are_independent() {
        let logos = RottenTomatoesLogo::new("/logos").logos(&set(&[
            (RatingName::RottenTomatoes, RatingType::Critic, 8.0),
            (RatingName::RottenTomatoes, RatingType::Audience, 4.0),
        ]));
        assert_eq!(logos[0].image_path, PathBuf::from("/logos/rottentomatoes-critic.png"));
        assert_eq!(logos[1].image_path, PathBuf::from("/logos/rottentomatoes-audience-low.png"));
    }
}
