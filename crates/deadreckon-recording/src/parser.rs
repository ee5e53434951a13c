use deadreckon_nav::SampleBuffer;

/// Columns after the time field: w, x, y, z, ax, ay, az.
const VALUE_COLUMNS: usize = 7;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// A parsed time column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timestamp {
    /// Wall-clock time of day in seconds, from `HH:MM:SS.ffffff`.
    Clock(f64),
    /// Milliseconds since the previous sample.
    DeltaMillis(f64),
}

impl Timestamp {
    pub fn parse(field: &str) -> Option<Self> {
        let field = field.trim();
        if field.contains(':') {
            let mut parts = field.split(':');
            let hours: u32 = parts.next()?.parse().ok()?;
            let minutes: u32 = parts.next()?.parse().ok()?;
            let seconds: f64 = parts.next()?.parse().ok()?;
            if parts.next().is_some() || minutes >= 60 || !(0.0..60.0).contains(&seconds) {
                return None;
            }
            Some(Timestamp::Clock(
                hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
            ))
        } else {
            let millis: f64 = field.parse().ok()?;
            millis.is_finite().then_some(Timestamp::DeltaMillis(millis))
        }
    }
}

/// Turns consecutive timestamps into per-sample time steps (seconds).
///
/// Clock timestamps are differenced against the previous clock reading; the
/// first one yields 0. A jump back of more than half a day is a midnight
/// rollover. Other backwards steps clamp to 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeAccumulator {
    previous_clock: Option<f64>,
}

impl TimeAccumulator {
    pub fn step(&mut self, timestamp: Timestamp) -> f32 {
        let dt = match timestamp {
            Timestamp::Clock(now) => {
                let dt = match self.previous_clock {
                    Some(previous) => {
                        let mut dt = now - previous;
                        if dt < -SECONDS_PER_DAY / 2.0 {
                            dt += SECONDS_PER_DAY;
                        }
                        dt
                    }
                    None => 0.0,
                };
                self.previous_clock = Some(now);
                dt
            }
            Timestamp::DeltaMillis(millis) => millis / 1000.0,
        };
        dt.max(0.0) as f32
    }
}

/// Counters reported after a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Sample rows accepted.
    pub rows: usize,
    /// Fields that were missing or unparseable and replaced by zero.
    pub substituted_fields: usize,
    /// Header and blank lines.
    pub skipped_lines: usize,
}

/// Line-oriented parser for `t,w,x,y,z,ax,ay,az` recordings.
///
/// Feed lines with `push_line`, then take the buffer with `finish`.
/// Bad numeric fields never abort a load: they become 0.0 and are logged.
#[derive(Debug, Default)]
pub struct RecordingParser {
    buffer: SampleBuffer,
    clock: TimeAccumulator,
    stats: LoadStats,
    seen_first_line: bool,
}

impl RecordingParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one text line. `line_number` is 1-based and used for logging only.
    pub fn push_line(&mut self, line_number: usize, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            self.stats.skipped_lines += 1;
            return;
        }

        let first_line = !self.seen_first_line;
        self.seen_first_line = true;
        if first_line && !line.starts_with(|c: char| c.is_ascii_digit()) {
            tracing::debug!(header = line, "Skipping recording header");
            self.stats.skipped_lines += 1;
            return;
        }

        let mut fields = line.split(',').map(str::trim);

        let dt = match fields.next().and_then(Timestamp::parse) {
            Some(timestamp) => self.clock.step(timestamp),
            None => {
                tracing::warn!(line = line_number, column = 0, "Malformed timestamp, using dt = 0");
                self.stats.substituted_fields += 1;
                0.0
            }
        };

        let mut values = [0.0f32; VALUE_COLUMNS];
        for (column, value) in values.iter_mut().enumerate() {
            match fields.next() {
                Some(field) => match field.parse::<f32>() {
                    Ok(v) => *value = v,
                    Err(e) => {
                        tracing::warn!(line = line_number, column = column + 1, field, %e, "Malformed field, using 0");
                        self.stats.substituted_fields += 1;
                    }
                },
                None => {
                    tracing::warn!(line = line_number, column = column + 1, "Missing field, using 0");
                    self.stats.substituted_fields += 1;
                }
            }
        }

        let [w, x, y, z, ax, ay, az] = values;
        self.buffer.push(dt, [w, x, y, z], [ax, ay, az]);
        self.stats.rows += 1;
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    pub fn finish(self) -> (SampleBuffer, LoadStats) {
        (self.buffer, self.stats)
    }
}
