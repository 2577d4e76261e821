//! robots.txt policy check
//!
//! The crawl is only started when the lookup path is allowed for our user
//! agent. Groups are matched by product token, falling back to `*`; within a
//! group the longest matching prefix decides, and `Allow` wins a tie.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::fetcher::lookup::{robots_url, LOOKUP_PATH};
use crate::fetcher::{Fetch, FetcherResult};

/// Rules of one user-agent group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct GroupRules {
    allow: Vec<String>,
    disallow: Vec<String>,
}

impl GroupRules {
    fn permits(&self, path: &str) -> bool {
        let longest = |prefixes: &[String]| {
            prefixes
                .iter()
                .filter(|prefix| path.starts_with(prefix.as_str()))
                .map(|prefix| prefix.len())
                .max()
        };
        match (longest(&self.allow), longest(&self.disallow)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }
}

/// Parsed robots.txt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsTxt {
    groups: HashMap<String, GroupRules>,
    wildcard: GroupRules,
}

impl RobotsTxt {
    /// Parse robots.txt content; unknown directives are ignored
    pub fn parse(content: &str) -> Self {
        let mut robots = Self::default();
        let mut agents: Vec<String> = Vec::new();
        let mut rules = GroupRules::default();
        let mut in_rules = false;

        for raw in content.lines() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match directive.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group
                    if in_rules {
                        robots.store_group(&agents, std::mem::take(&mut rules));
                        agents.clear();
                        in_rules = false;
                    }
                    agents.push(value.to_lowercase());
                }
                "allow" => {
                    in_rules = true;
                    if !value.is_empty() {
                        rules.allow.push(value.to_string());
                    }
                }
                "disallow" => {
                    in_rules = true;
                    if !value.is_empty() {
                        rules.disallow.push(value.to_string());
                    }
                }
                _ => {}
            }
        }
        robots.store_group(&agents, rules);

        robots
    }

    fn store_group(&mut self, agents: &[String], rules: GroupRules) {
        for agent in agents {
            let target = if agent == "*" {
                &mut self.wildcard
            } else {
                self.groups.entry(agent.clone()).or_default()
            };
            target.allow.extend(rules.allow.iter().cloned());
            target.disallow.extend(rules.disallow.iter().cloned());
        }
    }

    /// Whether `path` may be fetched by `user_agent`
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let agent = user_agent.to_lowercase();
        let product = agent.split('/').next().unwrap_or_default();

        let rules = self
            .groups
            .get(product)
            .or_else(|| {
                self.groups
                    .iter()
                    .find(|(token, _)| agent.contains(token.as_str()))
                    .map(|(_, rules)| rules)
            })
            .unwrap_or(&self.wildcard);

        rules.permits(path)
    }
}

/// Robots check performed once before a crawl
pub struct RobotsPolicy;

impl RobotsPolicy {
    /// Fetch and parse the lookup host's robots.txt
    ///
    /// A 4xx answer means the host publishes no policy, which allows everything.
    pub async fn fetch(
        fetcher: &dyn Fetch,
        secure: bool,
        user_agent: &str,
    ) -> FetcherResult<RobotsTxt> {
        let url = robots_url(secure);
        debug!(url = %url, "Fetching robots policy");

        match fetcher.fetch(&url, user_agent).await {
            Ok(body) => Ok(RobotsTxt::parse(&String::from_utf8_lossy(&body))),
            Err(e) if e.is_client_error() => {
                warn!(error = %e, "No robots policy published, assuming crawling is allowed");
                Ok(RobotsTxt::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the symbol lookup may be crawled by `user_agent`
    pub async fn lookup_allowed(
        fetcher: &dyn Fetch,
        secure: bool,
        user_agent: &str,
    ) -> FetcherResult<bool> {
        let robots = Self::fetch(fetcher, secure, user_agent).await?;
        let allowed = robots.is_allowed(user_agent, LOOKUP_PATH);
        info!(allowed, path = LOOKUP_PATH, "Robots policy checked");
        Ok(allowed)
    }
}
