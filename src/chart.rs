//! Chart document: one tempo map plus the animation timelines of every
//! judge line
//!
//! The chart owns all event lists. Operations receive it explicitly; nothing
//! in the engine holds a reference to a "current" chart.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::errors::{ChartError, ChartResult};
use crate::models::time::RationalTime;
use crate::timeline::bpm::{BpmSegment, BpmTimeline};
use crate::timeline::event_list::IndexedEventList;
use crate::timeline::records::EventRecord;

/// Animated property of a judge line
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, serde_repr::Serialize_repr, serde_repr::Deserialize_repr,
)]
#[repr(u8)]
pub enum EventChannel {
    MoveX = 0,
    MoveY = 1,
    Rotate = 2,
    Alpha = 3,
    Speed = 4,
}

impl EventChannel {
    pub const ALL: [EventChannel; 5] = [
        EventChannel::MoveX,
        EventChannel::MoveY,
        EventChannel::Rotate,
        EventChannel::Alpha,
        EventChannel::Speed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventChannel::MoveX => "moveX",
            EventChannel::MoveY => "moveY",
            EventChannel::Rotate => "rotate",
            EventChannel::Alpha => "alpha",
            EventChannel::Speed => "speed",
        }
    }

    pub fn from_code(code: u8) -> ChartResult<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| ChartError::value(format!("unknown event channel {}", code)))
    }

    /// Value a line shows when its channel has no events
    pub fn default_value(self) -> f64 {
        match self {
            EventChannel::Alpha => 255.0,
            EventChannel::Speed => 10.0,
            _ => 0.0,
        }
    }
}

/// Address of one event list in a chart
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventTarget {
    pub line: usize,
    pub channel: EventChannel,
}

impl EventTarget {
    pub fn new(line: usize, channel: EventChannel) -> Self {
        Self { line, channel }
    }
}

#[derive(Debug)]
pub struct JudgeLine {
    pub name: String,
    channels: [IndexedEventList<f64>; 5],
}

impl JudgeLine {
    /// A line holding every channel's default value
    pub fn new(name: impl Into<String>, duration: RationalTime, max_buckets: usize) -> Self {
        Self {
            name: name.into(),
            channels: EventChannel::ALL.map(|channel| {
                IndexedEventList::with_max_buckets(channel.default_value(), duration, max_buckets)
            }),
        }
    }

    pub fn channel(&self, channel: EventChannel) -> &IndexedEventList<f64> {
        &self.channels[channel as usize]
    }

    pub fn channel_mut(&mut self, channel: EventChannel) -> &mut IndexedEventList<f64> {
        &mut self.channels[channel as usize]
    }

    fn from_data(data: &JudgeLineData, duration: RationalTime, max_buckets: usize) -> ChartResult<Self> {
        let mut line = Self::new(data.name.clone(), duration, max_buckets);
        for channel in EventChannel::ALL {
            let records = data.records(channel);
            if !records.is_empty() {
                line.channels[channel as usize] =
                    IndexedEventList::import_with_max_buckets(records, duration, max_buckets)?;
            }
        }
        Ok(line)
    }

    fn to_data(&self) -> JudgeLineData {
        JudgeLineData {
            name: self.name.clone(),
            move_x: self.channel(EventChannel::MoveX).dump(),
            move_y: self.channel(EventChannel::MoveY).dump(),
            rotate: self.channel(EventChannel::Rotate).dump(),
            alpha: self.channel(EventChannel::Alpha).dump(),
            speed: self.channel(EventChannel::Speed).dump(),
        }
    }
}

/// Saved form of a judge line
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeLineData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub move_x: Vec<EventRecord<f64>>,
    #[serde(default)]
    pub move_y: Vec<EventRecord<f64>>,
    #[serde(default)]
    pub rotate: Vec<EventRecord<f64>>,
    #[serde(default)]
    pub alpha: Vec<EventRecord<f64>>,
    #[serde(default)]
    pub speed: Vec<EventRecord<f64>>,
}

impl JudgeLineData {
    fn records(&self, channel: EventChannel) -> &[EventRecord<f64>] {
        match channel {
            EventChannel::MoveX => &self.move_x,
            EventChannel::MoveY => &self.move_y,
            EventChannel::Rotate => &self.rotate,
            EventChannel::Alpha => &self.alpha,
            EventChannel::Speed => &self.speed,
        }
    }
}

/// Saved form of a chart
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub duration: RationalTime,
    pub bpm_list: Vec<BpmSegment>,
    #[serde(default)]
    pub judge_lines: Vec<JudgeLineData>,
}

#[derive(Debug)]
pub struct Chart {
    bpm: BpmTimeline,
    lines: Vec<JudgeLine>,
    max_buckets: usize,
}

impl Chart {
    /// An empty chart at a constant tempo
    pub fn new(duration: RationalTime, bpm: f64) -> ChartResult<Self> {
        let max_buckets = EngineConfig::default().max_buckets;
        Ok(Self {
            bpm: BpmTimeline::build_with_max_buckets(
                &[BpmSegment::new(RationalTime::ZERO, bpm)],
                duration,
                max_buckets,
            )?,
            lines: Vec::new(),
            max_buckets,
        })
    }

    pub fn from_data(data: &ChartData, config: &EngineConfig) -> ChartResult<Self> {
        let bpm = BpmTimeline::build_with_max_buckets(&data.bpm_list, data.duration, config.max_buckets)?;
        let lines = data
            .judge_lines
            .iter()
            .map(|line| JudgeLine::from_data(line, data.duration, config.max_buckets))
            .collect::<ChartResult<Vec<_>>>()?;
        log::info!(
            "chart loaded: {} lines, {} tempo segments, {} beats",
            lines.len(),
            data.bpm_list.len(),
            data.duration
        );
        Ok(Self {
            bpm,
            lines,
            max_buckets: config.max_buckets,
        })
    }

    pub fn to_data(&self) -> ChartData {
        ChartData {
            duration: self.duration(),
            bpm_list: self.bpm.segments(),
            judge_lines: self.lines.iter().map(JudgeLine::to_data).collect(),
        }
    }

    pub fn from_json(json: &str, config: &EngineConfig) -> ChartResult<Self> {
        let data: ChartData = serde_json::from_str(json)?;
        Self::from_data(&data, config)
    }

    pub fn to_json(&self) -> ChartResult<String> {
        Ok(serde_json::to_string(&self.to_data())?)
    }

    pub fn duration(&self) -> RationalTime {
        self.bpm.duration()
    }

    /// Change the effective span of every timeline
    pub fn set_duration(&mut self, duration: RationalTime) -> ChartResult<()> {
        self.bpm.set_duration(duration)?;
        for line in &mut self.lines {
            for channel in EventChannel::ALL {
                line.channel_mut(channel).set_effective_beats(duration);
            }
        }
        Ok(())
    }

    pub fn bpm(&self) -> &BpmTimeline {
        &self.bpm
    }

    pub fn bpm_mut(&mut self) -> &mut BpmTimeline {
        &mut self.bpm
    }

    pub fn lines(&self) -> &[JudgeLine] {
        &self.lines
    }

    /// Append a judge line holding default values; returns its index
    pub fn add_line(&mut self, name: impl Into<String>) -> usize {
        self.lines.push(JudgeLine::new(name, self.duration(), self.max_buckets));
        self.lines.len() - 1
    }

    pub fn line(&self, index: usize) -> ChartResult<&JudgeLine> {
        self.lines
            .get(index)
            .ok_or_else(|| ChartError::value(format!("judge line {} does not exist", index)))
    }

    pub fn line_mut(&mut self, index: usize) -> ChartResult<&mut JudgeLine> {
        self.lines
            .get_mut(index)
            .ok_or_else(|| ChartError::value(format!("judge line {} does not exist", index)))
    }

    pub fn events(&self, target: EventTarget) -> ChartResult<&IndexedEventList<f64>> {
        Ok(self.line(target.line)?.channel(target.channel))
    }

    pub fn events_mut(&mut self, target: EventTarget) -> ChartResult<&mut IndexedEventList<f64>> {
        Ok(self.line_mut(target.line)?.channel_mut(target.channel))
    }

    /// Channel value of a line at `beats`, clamped outside the chart
    pub fn value_at(&self, target: EventTarget, beats: RationalTime) -> ChartResult<f64> {
        if beats < RationalTime::ZERO {
            log::warn!("value query at {} clamped to chart start", beats);
        }
        Ok(self.events(target)?.value_at(beats))
    }

    pub fn seconds_at(&self, beats: RationalTime) -> f64 {
        self.bpm.to_seconds(beats)
    }

    pub fn beats_at(&self, seconds: f64) -> f64 {
        self.bpm.to_beats(seconds)
    }
}
