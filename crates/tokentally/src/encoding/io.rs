//! # Rank Table IO
//!
//! Reads and writes the tiktoken rank-file format: one `base64(bytes) rank`
//! entry per line, ranks ascending but not required to be dense.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context};
use base64::prelude::BASE64_STANDARD;
use base64::Engine;

use crate::encoding::SpanRankMap;
use crate::types::TokenType;

/// Load a [`SpanRankMap`] from a tiktoken rank file.
///
/// # Arguments
/// * `path` - the path to the rank file.
pub fn load_rank_map_from_path<T, P>(path: P) -> anyhow::Result<SpanRankMap<T>>
where
    T: TokenType,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("failed to open rank file {}", path.display()))?;
    load_rank_map_from_reader(BufReader::new(file))
}

/// Load a [`SpanRankMap`] from a tiktoken rank [`BufRead`] stream.
///
/// # Arguments
/// * `reader` - the line reader.
pub fn load_rank_map_from_reader<T, R>(reader: R) -> anyhow::Result<SpanRankMap<T>>
where
    T: TokenType,
    R: BufRead,
{
    let mut ranks: SpanRankMap<T> = Default::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let Some((span_part, rank_part)) = line.split_once(' ') else {
            bail!("rank file line {} is not \"<base64> <rank>\"", line_no + 1);
        };

        let span = BASE64_STANDARD
            .decode(span_part)
            .with_context(|| format!("bad base64 on rank file line {}", line_no + 1))?;

        let rank: u64 = rank_part
            .parse()
            .with_context(|| format!("bad rank on rank file line {}", line_no + 1))?;
        let rank = T::from_u64(rank).context("rank out of range for token type")?;

        ranks.insert(span, rank);
    }

    Ok(ranks)
}

/// Save a [`SpanRankMap`] to a tiktoken rank file.
///
/// # Arguments
/// * `ranks` - the rank map to save.
/// * `path` - the path to save to.
pub fn save_rank_map_to_path<T: TokenType, P: AsRef<Path>>(
    ranks: &SpanRankMap<T>,
    path: P,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    save_rank_map_to_writer(ranks, &mut writer)
}

/// Save a [`SpanRankMap`] to a [`Write`] writer, in ascending rank order.
pub fn save_rank_map_to_writer<T, W>(
    ranks: &SpanRankMap<T>,
    writer: &mut W,
) -> anyhow::Result<()>
where
    T: TokenType,
    W: Write,
{
    let mut items: Vec<(T, &Vec<u8>)> = ranks.iter().map(|(span, &rank)| (rank, span)).collect();
    items.sort_by_key(|(rank, _)| *rank);

    for (rank, span) in items {
        writeln!(writer, "{} {}", BASE64_STANDARD.encode(span), rank)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_roundtrip() {
        type T = u32;

        let mut ranks: SpanRankMap<T> = Default::default();
        ranks.insert(b"apple".to_vec(), 300);
        ranks.insert(b"banana".to_vec(), 301);
        ranks.insert(vec![0xff, 0xfe], 302);

        let dir = tempdir::TempDir::new("rank_io_test").unwrap();
        let path = dir.path().join("test.tiktoken");

        save_rank_map_to_path(&ranks, &path).expect("failed to save ranks");
        let loaded: SpanRankMap<T> = load_rank_map_from_path(&path).expect("failed to load ranks");

        assert_eq!(&loaded, &ranks);
    }

    #[test]
    fn test_malformed_line() {
        let data = b"bm90LWEtcmFuaw==\n" as &[u8];
        let err = load_rank_map_from_reader::<u32, _>(data).unwrap_err();
        assert!(format!("{err}").contains("line 1"));
    }

    #[test]
    fn test_rank_out_of_range() {
        let data = b"YQ== 70000\n" as &[u8];
        let err = load_rank_map_from_reader::<u16, _>(data).unwrap_err();
        assert!(format!("{err}").contains("out of range"));
    }
}
