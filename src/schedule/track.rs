use serde::Serialize;

/// One output record, timed relative to the previous record on its track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackEvent {
    pub is_note_on: bool,
    pub pitch: u8,
    pub velocity: u8,
    pub delta_ticks: u32,
    pub channel: u8,
}

/// An independent event stream with its own time cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub index: usize,
    pub channel: u8,
    pub events: Vec<TrackEvent>,
    /// Absolute tick of the last emitted event.
    #[serde(skip)]
    cursor: u64,
}

impl Track {
    pub fn new(index: usize, channel: u8) -> Self {
        Self {
            index,
            channel,
            events: Vec::new(),
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn note_on(&mut self, tick: u64, pitch: u8, velocity: u8) {
        self.push(tick, pitch, velocity, true);
    }

    pub fn note_off(&mut self, tick: u64, pitch: u8) {
        self.push(tick, pitch, 0, false);
    }

    pub fn note_on_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_note_on).count()
    }

    fn push(&mut self, tick: u64, pitch: u8, velocity: u8, is_note_on: bool) {
        debug_assert!(tick >= self.cursor, "events must arrive in time order");
        let tick = tick.max(self.cursor);
        let delta = tick - self.cursor;
        let delta_ticks = match u32::try_from(delta) {
            Ok(d) => d,
            Err(_) => {
                log::warn!("Track {}: delta of {} ticks clamped", self.index, delta);
                u32::MAX
            }
        };
        self.cursor += delta_ticks as u64;
        self.events.push(TrackEvent {
            is_note_on,
            pitch,
            velocity,
            delta_ticks,
            channel: self.channel,
        });
    }
}
