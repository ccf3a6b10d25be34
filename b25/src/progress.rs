use colored::Colorize;
use std::io::{self, Write};
use std::time::Instant;

/// In-place processing status line on stderr, updated once per frame.
pub struct Progress {
    total: u64,
    last_stat_time: Instant,
    last_stat_bytes: u64,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        write!(handle, "\x1B[?25l").unwrap();
        handle.flush().unwrap();

        Self {
            total,
            last_stat_time: Instant::now(),
            last_stat_bytes: 0,
        }
    }

    pub fn update(&mut self, current: u64) {
        let now = Instant::now();
        let elapsed_secs = now.duration_since(self.last_stat_time).as_secs_f64();

        let speed = if elapsed_secs > 0.0 {
            (current.saturating_sub(self.last_stat_bytes)) as f64 / elapsed_secs
        } else {
            0.0
        };

        let remaining = self.total.saturating_sub(current);
        let eta_seconds = if speed > 0.0 {
            (remaining as f64 / speed) as u64
        } else {
            0
        };

        // Percentage in hundredths, integer arithmetic.
        let m = if self.total > 0 {
            current * 10_000 / self.total
        } else {
            10_000
        };

        let stderr = io::stderr();
        let mut handle = stderr.lock();
        write!(
            handle,
            "\r\x1B[2Kprocessing: {:2}.{:02}% {} {} ETA:{}",
            m / 100,
            m % 100,
            format!("({}/{})", ByteSize(current), ByteSize(self.total)).cyan(),
            format!("{}/s", ByteSize(speed as u64)).green(),
            Eta(eta_seconds).to_string().yellow(),
        )
        .unwrap();
        handle.flush().unwrap();

        self.last_stat_time = now;
        self.last_stat_bytes = current;
    }

    pub fn finish(&mut self) {
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        writeln!(handle, "\r\x1B[2Kprocessing: finish").unwrap();
        handle.flush().unwrap();
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        write!(handle, "\x1B[?25h").unwrap();
        handle.flush().unwrap();
    }
}

struct ByteSize(u64);

impl std::fmt::Display for ByteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const KIB: f64 = 1024.0;
        const MIB: f64 = KIB * 1024.0;
        const GIB: f64 = MIB * 1024.0;

        let bytes = self.0 as f64;

        if bytes >= GIB {
            write!(f, "{:.1}GiB", bytes / GIB)
        } else if bytes >= MIB {
            write!(f, "{:.1}MiB", bytes / MIB)
        } else if bytes >= KIB {
            write!(f, "{:.1}KiB", bytes / KIB)
        } else {
            write!(f, "{}B", self.0)
        }
    }
}

struct Eta(u64);

impl std::fmt::Display for Eta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total_seconds = self.0;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            write!(f, "{}h{}m{}s", hours, minutes, seconds)
        } else if minutes > 0 {
            write!(f, "{}m{}s", minutes, seconds)
        } else {
            write!(f, "{}s", seconds)
        }
    }
}
