//! Ordered, first-match-wins channel classification
//!
//! Each region owns a ladder of [`Rule`]s. The first rule whose [`Matcher`]
//! accepts the display name decides the category; a region without a ladder
//! classifies nothing.

use std::collections::{BTreeSet, HashMap};

use crate::models::Group;

const MAINLAND: &str = "中国大陆";
const HONG_KONG: &str = "中国香港";
const TAIWAN: &str = "中国台湾";
const INTERNATIONAL: &str = "国际频道";

/// Predicate over a display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Any keyword is a (case-sensitive) substring of the name
    Contains(Vec<String>),
    /// Any keyword is a substring of the uppercased name; keywords are uppercased on construction
    ContainsUpper(Vec<String>),
    All(Vec<Matcher>),
    Any(Vec<Matcher>),
    Always,
}

impl Matcher {
    pub fn contains(keywords: &[&str]) -> Self {
        Self::Contains(keywords.iter().map(|k| k.to_string()).collect())
    }

    pub fn contains_upper(keywords: &[&str]) -> Self {
        Self::ContainsUpper(keywords.iter().map(|k| k.to_uppercase()).collect())
    }

    fn matches(&self, name: &str, upper: &str) -> bool {
        match self {
            Matcher::Contains(keywords) => keywords.iter().any(|k| name.contains(k.as_str())),
            Matcher::ContainsUpper(keywords) => {
                keywords.iter().any(|k| upper.contains(k.as_str()))
            }
            Matcher::All(matchers) => matchers.iter().all(|m| m.matches(name, upper)),
            Matcher::Any(matchers) => matchers.iter().any(|m| m.matches(name, upper)),
            Matcher::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub matcher: Matcher,
    pub category: String,
}

impl Rule {
    pub fn new<C: Into<String>>(matcher: Matcher, category: C) -> Self {
        Self {
            matcher,
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    ladders: HashMap<String, Vec<Rule>>,
}

impl Classifier {
    /// A classifier with no regions; every entry is unclassifiable
    pub fn empty() -> Self {
        Self::default()
    }

    /// Install (or replace) the rule ladder for `region`
    pub fn with_region<R: Into<String>>(mut self, region: R, rules: Vec<Rule>) -> Self {
        self.ladders.insert(region.into(), rules);
        self
    }

    /// Mainland, Hong Kong, Taiwan and international ladders
    pub fn builtin() -> Self {
        Self::empty()
            .with_region(MAINLAND, mainland_rules())
            .with_region(HONG_KONG, greater_china_rules())
            .with_region(TAIWAN, greater_china_rules())
            .with_region(INTERNATIONAL, international_rules())
    }

    pub fn classify(&self, region: &str, name: &str) -> Option<Group> {
        let rules = self.ladders.get(region)?;
        let upper = name.to_uppercase();

        rules
            .iter()
            .find(|rule| rule.matcher.matches(name, &upper))
            .map(|rule| Group::new(region, rule.category.as_str()))
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.ladders.keys().map(String::as_str)
    }

    /// Every group some rule can produce
    pub fn groups(&self) -> BTreeSet<Group> {
        self.ladders
            .iter()
            .flat_map(|(region, rules)| {
                rules
                    .iter()
                    .map(move |rule| Group::new(region.as_str(), rule.category.as_str()))
            })
            .collect()
    }

    /// True when the ladder for `region` ends in a catch-all rule
    pub fn has_catch_all(&self, region: &str) -> bool {
        self.ladders
            .get(region)
            .and_then(|rules| rules.last())
            .is_some_and(|rule| rule.matcher == Matcher::Always)
    }
}

fn mainland_rules() -> Vec<Rule> {
    vec![
        // CCTV-5 / CCTV-5+ and anything sports-labelled in the CCTV family is sports, not 央视
        Rule::new(
            Matcher::All(vec![
                Matcher::contains_upper(&["CCTV"]),
                Matcher::Any(vec![
                    Matcher::contains_upper(&["5"]),
                    Matcher::contains(&["体育"]),
                ]),
            ]),
            "体育",
        ),
        Rule::new(Matcher::contains_upper(&["CCTV"]), "央视"),
        Rule::new(Matcher::contains(&["卫视"]), "卫视"),
        Rule::new(Matcher::contains(&["新闻"]), "新闻"),
        Rule::new(Matcher::contains(&["体育"]), "体育"),
        Rule::new(Matcher::contains(&["电影", "影视"]), "影视"),
        Rule::new(Matcher::contains(&["综艺"]), "综艺"),
        Rule::new(Matcher::Always, "其他"),
    ]
}

fn greater_china_rules() -> Vec<Rule> {
    vec![
        Rule::new(Matcher::contains(&["新闻"]), "新闻"),
        Rule::new(Matcher::contains(&["体育"]), "体育"),
        Rule::new(Matcher::contains(&["综艺"]), "综艺"),
        Rule::new(Matcher::contains(&["电影", "影视"]), "影视"),
        Rule::new(Matcher::Always, "综合"),
    ]
}

fn international_rules() -> Vec<Rule> {
    vec![
        Rule::new(Matcher::contains_upper(&["SPORT"]), "体育"),
        Rule::new(Matcher::contains_upper(&["MUSIC"]), "音乐"),
        Rule::new(
            Matcher::Any(vec![
                Matcher::contains_upper(&["GAME"]),
                Matcher::contains(&["电竞"]),
            ]),
            "游戏",
        ),
        Rule::new(Matcher::contains_upper(&["MOVIE", "FILM"]), "影视"),
        Rule::new(Matcher::Always, "综合"),
    ]
}
