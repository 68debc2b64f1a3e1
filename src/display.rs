use crate::format::Channel;
use crate::meter::MeterReading;

/// Renders meter readings as text bars for a terminal.
/// Knows nothing about the converter, only percentages.
pub struct LevelDisplay {
    bar_width: usize,
}

impl LevelDisplay {
    pub fn new(bar_width: usize) -> Self {
        Self {
            bar_width: bar_width.max(1),
        }
    }

    /// `[#####     ]  50%`
    pub fn bar(&self, percent: u8) -> String {
        let percent = percent.min(100) as usize;
        let filled = (percent * self.bar_width + 50) / 100;
        format!(
            "[{}{}] {:>3}%",
            "#".repeat(filled),
            " ".repeat(self.bar_width - filled),
            percent
        )
    }

    /// One line with both channels.
    pub fn format_reading(&self, reading: &MeterReading) -> String {
        [Channel::Left, Channel::Right]
            .iter()
            .map(|&channel| {
                let tag = match channel {
                    Channel::Left => 'L',
                    Channel::Right => 'R',
                };
                format!("{} {}", tag, self.bar(reading.percent(channel)))
            })
            .collect::<Vec<_>>()
            .join("  ")
    }
}
