//! # Table Statistics as Substrait Advanced Extensions
//!
//! Scan statistics travel inside the plan so that the explainer can print
//! estimated cardinalities. They are attached to the `ReadRel` as an
//! `optimization` entry of its `AdvancedExtension`: a protobuf `Any` with the
//! type URL `type.googleapis.com/planx.TableStatisticsExtension`.
//!
//! Optimizations may be ignored by consumers, so a plan carrying this
//! extension stays valid for engines that do not know it. Entries with other
//! type URLs are skipped on decode.
//!
//! ## Prost Manual Encoding
//!
//! The message types are plain structs with `prost` derive macros, so no
//! `.proto` file or `protoc` is needed.

use planx_core::stats::{ColumnStatistics, Statistics};
use prost::Message;
use substrait::proto::extensions::AdvancedExtension;

/// Type URL identifying the statistics message inside the `Any` wrapper.
pub const STATS_TYPE_URL: &str = "type.googleapis.com/planx.TableStatisticsExtension";

/// Build an advanced extension carrying `stats`.
pub fn encode_statistics(stats: &Statistics) -> AdvancedExtension {
    let message = TableStatisticsProto {
        row_count: stats.row_count,
        total_size_bytes: stats.total_size_bytes,
        columns: stats
            .column_stats
            .iter()
            .map(|(name, cs)| ColumnStatisticsProto {
                column_name: name.clone(),
                distinct_count: cs.distinct_count,
                null_fraction: cs.null_fraction,
                avg_row_size: cs.avg_row_size,
            })
            .collect(),
    };

    let mut ext = AdvancedExtension::default();
    ext.optimization.push(Default::default());
    if let Some(any) = ext.optimization.last_mut() {
        any.type_url = STATS_TYPE_URL.into();
        any.value = message.encode_to_vec().into();
    }
    ext
}

/// Statistics carried by an advanced extension, if any.
///
/// Returns `Ok(None)` when no entry has our type URL and an error when one
/// does but its payload does not decode.
pub fn decode_statistics(ext: &AdvancedExtension) -> Result<Option<Statistics>, prost::DecodeError> {
    let Some(any) = ext.optimization.iter().find(|a| a.type_url == STATS_TYPE_URL) else {
        return Ok(None);
    };
    let message = TableStatisticsProto::decode(&any.value[..])?;
    let mut stats = Statistics::new(message.row_count, message.total_size_bytes);
    for col in message.columns {
        stats.column_stats.insert(
            col.column_name,
            ColumnStatistics {
                distinct_count: col.distinct_count,
                null_fraction: col.null_fraction,
                avg_row_size: col.avg_row_size,
            },
        );
    }
    Ok(Some(stats))
}

/// Protobuf message for table-level statistics. Field tags are the wire format.
#[derive(Clone, PartialEq, Message)]
pub struct TableStatisticsProto {
    #[prost(double, tag = "1")]
    pub row_count: f64,
    #[prost(double, tag = "2")]
    pub total_size_bytes: f64,
    #[prost(message, repeated, tag = "3")]
    pub columns: Vec<ColumnStatisticsProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ColumnStatisticsProto {
    #[prost(string, tag = "1")]
    pub column_name: String,
    #[prost(double, tag = "2")]
    pub distinct_count: f64,
    #[prost(double, tag = "3")]
    pub null_fraction: f64,
    #[prost(double, tag = "4")]
    pub avg_row_size: f64,
}
