//! Playlist rendering and publication
//!
//! Rendering is a pure function of the pool, the selection and the ordering
//! tables: rendering the same pool twice gives byte-identical output.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::config::{OrderingConfig, PlaylistConfig};
use crate::data_mapping::GroupTable;
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, ChannelPool, Group};
use crate::utils::StagedFile;

/// Position given to flagship names missing from the canonical order
pub const UNLISTED_FLAGSHIP_POSITION: usize = usize::MAX;

pub const M3U_CONTENT_TYPE: &str = "audio/x-mpegurl";
pub const TXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Which `(group, name)` keys a playlist includes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistSelection {
    All,
    Groups(BTreeSet<Group>),
}

impl PlaylistSelection {
    /// An empty label list selects everything
    pub fn from_labels<I, S>(labels: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let groups = labels
            .into_iter()
            .map(|l| l.as_ref().parse::<Group>())
            .collect::<AppResult<BTreeSet<_>>>()?;
        if groups.is_empty() {
            return Ok(Self::All);
        }
        Ok(Self::Groups(groups))
    }

    pub fn matches(&self, group: &Group, _name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Groups(groups) => groups.contains(group),
        }
    }
}

/// Output encodings written for every playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistFormat {
    M3u,
    Txt,
}

impl PlaylistFormat {
    pub const ALL: [PlaylistFormat; 2] = [PlaylistFormat::M3u, PlaylistFormat::Txt];

    pub fn extension(self) -> &'static str {
        match self {
            Self::M3u => "m3u",
            Self::Txt => "txt",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::M3u => M3U_CONTENT_TYPE,
            Self::Txt => TXT_CONTENT_TYPE,
        }
    }
}

/// A named playlist: file stem, serving route and selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDefinition {
    pub name: String,
    pub route: String,
    pub selection: PlaylistSelection,
}

impl PlaylistDefinition {
    pub fn new<N: Into<String>, R: Into<String>>(
        name: N,
        route: R,
        selection: PlaylistSelection,
    ) -> Self {
        Self {
            name: name.into(),
            route: route.into(),
            selection,
        }
    }

    pub fn from_config(config: &PlaylistConfig) -> AppResult<Self> {
        Ok(Self::new(
            &config.name,
            &config.route,
            PlaylistSelection::from_labels(&config.groups)?,
        ))
    }

    pub fn from_configs(configs: &[PlaylistConfig]) -> AppResult<Vec<Self>> {
        configs.iter().map(Self::from_config).collect()
    }

    pub fn path(&self, output_dir: &Path, format: PlaylistFormat) -> PathBuf {
        output_dir.join(format!("{}.{}", self.name, format.extension()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistEntry {
    pub group: Group,
    pub name: String,
    pub url: String,
}

/// Sorted, flattened `(group, name, url)` triples of one playlist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPlaylist {
    entries: Vec<PlaylistEntry>,
    channels: usize,
}

impl RenderedPlaylist {
    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct channels the entries came from
    pub fn channel_count(&self) -> usize {
        self.channels
    }

    pub fn to_m3u(&self) -> String {
        let mut content = String::from("#EXTM3U\n");
        for entry in &self.entries {
            content.push_str(&format!(
                "#EXTINF:-1 group-title=\"{}\",{}\n{}\n",
                entry.group, entry.name, entry.url
            ));
        }
        content
    }

    pub fn to_txt(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{},{}\n", entry.name, entry.url))
            .collect()
    }

    pub fn encode(&self, format: PlaylistFormat) -> String {
        match format {
            PlaylistFormat::M3u => self.to_m3u(),
            PlaylistFormat::Txt => self.to_txt(),
        }
    }
}

/// Orders the pool by group rank, then flagship position or name
#[derive(Debug, Clone)]
pub struct PlaylistRenderer {
    groups: GroupTable,
    flagship_group: Group,
    flagship_positions: HashMap<String, usize>,
}

impl PlaylistRenderer {
    pub fn new<I, S>(groups: GroupTable, flagship_group: Group, flagship_order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flagship_positions = HashMap::new();
        for (position, name) in flagship_order.into_iter().enumerate() {
            flagship_positions
                .entry(name.as_ref().to_string())
                .or_insert(position);
        }
        Self {
            groups,
            flagship_group,
            flagship_positions,
        }
    }

    pub fn from_config(ordering: &OrderingConfig) -> AppResult<Self> {
        Ok(Self::new(
            GroupTable::from_ranks(&ordering.groups)?,
            ordering.flagship_group.parse()?,
            &ordering.flagship_order,
        ))
    }

    fn flagship_position(&self, channel: &Channel) -> usize {
        if channel.group != self.flagship_group {
            return 0;
        }
        self.flagship_positions
            .get(&channel.name)
            .copied()
            .unwrap_or(UNLISTED_FLAGSHIP_POSITION)
    }

    fn compare(&self, a: &Channel, b: &Channel) -> Ordering {
        self.groups
            .rank(&a.group)
            .cmp(&self.groups.rank(&b.group))
            .then_with(|| a.group.cmp(&b.group))
            .then_with(|| self.flagship_position(a).cmp(&self.flagship_position(b)))
            .then_with(|| a.name.cmp(&b.name))
    }

    pub fn render(&self, pool: &ChannelPool, selection: &PlaylistSelection) -> RenderedPlaylist {
        let mut channels: Vec<&Channel> = pool
            .channels()
            .filter(|c| selection.matches(&c.group, &c.name))
            .collect();
        channels.sort_by(|a, b| self.compare(a, b));

        let entries = channels
            .iter()
            .flat_map(|channel| {
                channel.urls.iter().map(|url| PlaylistEntry {
                    group: channel.group.clone(),
                    name: channel.name.clone(),
                    url: url.clone(),
                })
            })
            .collect();

        RenderedPlaylist {
            entries,
            channels: channels.len(),
        }
    }
}

impl Default for PlaylistRenderer {
    fn default() -> Self {
        let ordering = OrderingConfig::default();
        Self::new(
            GroupTable::default(),
            ordering
                .flagship_group
                .parse()
                .unwrap_or_else(|e| unreachable!("built-in flagship group is valid: {e}")),
            &ordering.flagship_order,
        )
    }
}

/// A playlist published by a rebuild
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenPlaylist {
    pub name: String,
    pub route: String,
    pub channels: usize,
    pub entries: usize,
    pub files: Vec<PathBuf>,
}

/// Publish every playlist in two phases: stage all temporary files, then
/// rename them into place. If any staging write fails nothing is renamed and
/// the previous outputs stay in place.
pub async fn write_playlists(
    output_dir: &Path,
    playlists: &[(PlaylistDefinition, RenderedPlaylist)],
) -> AppResult<Vec<WrittenPlaylist>> {
    let mut staged: Vec<StagedFile> = Vec::new();

    for (definition, rendered) in playlists {
        for format in PlaylistFormat::ALL {
            let target = definition.path(output_dir, format);
            match StagedFile::stage(&target, rendered.encode(format).as_bytes()).await {
                Ok(file) => staged.push(file),
                Err(e) => {
                    error!("Failed to stage playlist {}: {}", target.display(), e);
                    for file in staged {
                        file.discard().await;
                    }
                    return Err(AppError::Io(e));
                }
            }
        }
    }

    let mut committed = Vec::with_capacity(staged.len());
    let mut pending = staged.into_iter();
    while let Some(file) = pending.next() {
        let target = file.target().to_path_buf();
        match file.commit().await {
            Ok(path) => {
                debug!("Published {}", path.display());
                committed.push(path);
            }
            Err(e) => {
                error!("Failed to publish playlist {}: {}", target.display(), e);
                for file in pending {
                    file.discard().await;
                }
                return Err(AppError::Io(e));
            }
        }
    }

    let written: Vec<WrittenPlaylist> = playlists
        .iter()
        .map(|(definition, rendered)| WrittenPlaylist {
            name: definition.name.clone(),
            route: definition.route.clone(),
            channels: rendered.channel_count(),
            entries: rendered.len(),
            files: PlaylistFormat::ALL
                .iter()
                .map(|f| definition.path(output_dir, *f))
                .collect(),
        })
        .collect();

    info!(
        "Published {} playlists ({} files) to {}",
        written.len(),
        committed.len(),
        output_dir.display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn group(label: &str) -> Group {
        label.parse().unwrap()
    }

    fn sample_pool() -> ChannelPool {
        let mut pool = ChannelPool::new();
        pool.upsert(group("中国香港 | 综合"), "凤凰卫视".into(), "http://s/phoenix");
        pool.upsert(group("中国大陆 | 卫视"), "浙江卫视".into(), "http://s/zj");
        pool.upsert(group("中国大陆 | 卫视"), "湖南卫视".into(), "http://s/hn");
        pool.upsert(group("中国大陆 | 央视"), "CCTV-13".into(), "http://s/13");
        pool.upsert(group("中国大陆 | 央视"), "CCTV-2".into(), "http://s/2");
        pool.upsert(group("中国大陆 | 央视"), "CCTV-1".into(), "http://s/1a");
        pool.upsert(group("中国大陆 | 央视"), "CCTV-1".into(), "http://s/1b");
        pool.upsert(group("中国大陆 | 央视"), "CCTV-4K".into(), "http://s/4k");
        pool.upsert(group("火星 | 综合"), "Olympus".into(), "http://s/mars");
        pool
    }

    fn names(rendered: &RenderedPlaylist) -> Vec<&str> {
        rendered.entries().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_render_is_idempotent() {
        let renderer = PlaylistRenderer::default();
        let pool = sample_pool();
        let first = renderer.render(&pool, &PlaylistSelection::All);
        let second = renderer.render(&pool, &PlaylistSelection::All);
        assert_eq!(first.to_m3u(), second.to_m3u());
        assert_eq!(first.to_txt(), second.to_txt());
    }

    #[test]
    fn test_order_by_rank_then_flagship_position_then_name() {
        let rendered = PlaylistRenderer::default().render(&sample_pool(), &PlaylistSelection::All);
        assert_eq!(
            names(&rendered),
            vec![
                "CCTV-1", "CCTV-1", "CCTV-2", "CCTV-13", "CCTV-4K", // flagship order, unlisted last
                "浙江卫视", "湖南卫视", // lexicographic by code point
                "凤凰卫视",
                "Olympus", // unknown group last
            ]
        );
    }

    #[test]
    fn test_group_rank_orders_whole_groups() {
        let renderer = PlaylistRenderer::default();
        let table = GroupTable::default();
        let rendered = renderer.render(&sample_pool(), &PlaylistSelection::All);
        let ranks: Vec<u32> = rendered.entries().iter().map(|e| table.rank(&e.group)).collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_selection_by_group() {
        let selection =
            PlaylistSelection::from_labels(["中国大陆 | 央视", "中国大陆 | 卫视"]).unwrap();
        let rendered = PlaylistRenderer::default().render(&sample_pool(), &selection);
        assert!(
            rendered
                .entries()
                .iter()
                .all(|e| e.group.region == "中国大陆")
        );
        assert_eq!(rendered.channel_count(), 6);
        assert_eq!(rendered.len(), 7);
    }

    #[test]
    fn test_empty_labels_select_everything() {
        let labels: Vec<String> = Vec::new();
        assert_eq!(
            PlaylistSelection::from_labels(&labels).unwrap(),
            PlaylistSelection::All
        );
        assert!(PlaylistSelection::from_labels(["not a group"]).is_err());
    }

    #[test]
    fn test_encodings() {
        let mut pool = ChannelPool::new();
        pool.upsert(group("中国大陆 | 央视"), "CCTV-1".into(), "http://s/1a");
        pool.upsert(group("中国大陆 | 央视"), "CCTV-1".into(), "http://s/1b");
        let rendered = PlaylistRenderer::default().render(&pool, &PlaylistSelection::All);

        assert_eq!(
            rendered.to_m3u(),
            "#EXTM3U\n\
             #EXTINF:-1 group-title=\"中国大陆 | 央视\",CCTV-1\nhttp://s/1a\n\
             #EXTINF:-1 group-title=\"中国大陆 | 央视\",CCTV-1\nhttp://s/1b\n"
        );
        assert_eq!(rendered.to_txt(), "CCTV-1,http://s/1a\nCCTV-1,http://s/1b\n");
    }

    #[test]
    fn test_empty_pool_renders_header_only() {
        let rendered = PlaylistRenderer::default().render(&ChannelPool::new(), &PlaylistSelection::All);
        assert_eq!(rendered.to_m3u(), "#EXTM3U\n");
        assert_eq!(rendered.to_txt(), "");
    }

    #[tokio::test]
    async fn test_write_playlists_publishes_both_encodings() {
        let dir = TempDir::new().unwrap();
        let definition = PlaylistDefinition::new("iptv_full", "full", PlaylistSelection::All);
        let rendered = PlaylistRenderer::default().render(&sample_pool(), &definition.selection);

        let written = write_playlists(dir.path(), &[(definition.clone(), rendered.clone())])
            .await
            .unwrap();

        assert_eq!(written.len(), 1);
        assert_eq!(written[0].entries, rendered.len());
        let m3u = std::fs::read_to_string(dir.path().join("iptv_full.m3u")).unwrap();
        let txt = std::fs::read_to_string(dir.path().join("iptv_full.txt")).unwrap();
        assert_eq!(m3u, rendered.to_m3u());
        assert_eq!(txt, rendered.to_txt());
    }

    #[tokio::test]
    async fn test_failed_stage_leaves_previous_outputs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("good.m3u"), "old").unwrap();
        // A directory where the second playlist's temp file must go
        std::fs::create_dir(dir.path().join(".bad.m3u.tmp")).unwrap();

        let rendered = PlaylistRenderer::default().render(&sample_pool(), &PlaylistSelection::All);
        let playlists = vec![
            (
                PlaylistDefinition::new("good", "good", PlaylistSelection::All),
                rendered.clone(),
            ),
            (
                PlaylistDefinition::new("bad", "bad", PlaylistSelection::All),
                rendered,
            ),
        ];

        assert!(write_playlists(dir.path(), &playlists).await.is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("good.m3u")).unwrap(),
            "old"
        );
        assert!(!dir.path().join("good.txt").exists());
        assert!(!dir.path().join(".good.m3u.tmp").exists());
    }
}
