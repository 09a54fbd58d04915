//! Built-in defaults for the service configuration
//!
//! The tables here are only defaults: every one of them can be replaced from
//! the configuration file.

// Web
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3566;

// Storage
pub const DEFAULT_SOURCES_PATH: &str = "./config/m3u-sources.txt";
pub const DEFAULT_OUTPUT_PATH: &str = "./output";
pub const DEFAULT_FAILURE_LEDGER_PATH: &str = "./output/fail.db";

// Ingestion
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_FAILURE_LIMIT: u32 = 3;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
/// Daily at 04:00 (sec min hour day-of-month month day-of-week)
pub const DEFAULT_REFRESH_CRON: &str = "0 0 4 * * *";
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";

/// Geo / copyright / region-restriction markers
pub const DEFAULT_BLOCKED_KEYWORDS: &[&str] = &[
    "geo",
    "block",
    "restricted",
    "版权",
    "地区",
    "区域",
    "仅限",
    "海外",
    "港澳限定",
    "台灣限定",
];

pub const DEFAULT_FLAGSHIP_GROUP: &str = "中国大陆 | 央视";

pub const DEFAULT_FLAGSHIP_ORDER: &[&str] = &[
    "CCTV-1", "CCTV-2", "CCTV-3", "CCTV-4", "CCTV-5", "CCTV-5+", "CCTV-6", "CCTV-7", "CCTV-8",
    "CCTV-9", "CCTV-10", "CCTV-11", "CCTV-12", "CCTV-13", "CCTV-14", "CCTV-15", "CCTV-16",
    "CCTV-17",
];

/// Fixed group table: lower rank sorts first
pub const DEFAULT_GROUP_RANKS: &[(&str, u32)] = &[
    ("中国大陆 | 央视", 1),
    ("中国大陆 | 卫视", 2),
    ("中国大陆 | 体育", 3),
    ("中国大陆 | 新闻", 4),
    ("中国大陆 | 影视", 5),
    ("中国大陆 | 综艺", 6),
    ("中国香港 | 综合", 10),
    ("中国香港 | 新闻", 11),
    ("中国香港 | 影视", 12),
    ("中国香港 | 体育", 13),
    ("中国香港 | 综艺", 14),
    ("中国台湾 | 综合", 20),
    ("中国台湾 | 新闻", 21),
    ("中国台湾 | 影视", 22),
    ("中国台湾 | 体育", 23),
    ("中国台湾 | 综艺", 24),
    ("国际频道 | 综合", 30),
    ("国际频道 | 新闻", 31),
    ("国际频道 | 影视", 32),
    ("国际频道 | 体育", 33),
    ("国际频道 | 音乐", 34),
    ("国际频道 | 游戏", 35),
    ("中国大陆 | 其他", 99),
];

/// (file stem, route, groups); an empty group list selects everything
pub const DEFAULT_PLAYLISTS: &[(&str, &str, &[&str])] = &[
    ("iptv_full", "full", &[]),
    (
        "iptv_lite",
        "lite",
        &[
            "中国大陆 | 央视",
            "中国大陆 | 卫视",
            "中国香港 | 综合",
            "中国台湾 | 综合",
        ],
    ),
    ("iptv_cctv_ws", "cctv", &["中国大陆 | 央视", "中国大陆 | 卫视"]),
];
