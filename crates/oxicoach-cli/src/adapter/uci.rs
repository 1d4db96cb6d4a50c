//! [`EvaluationPort`] backed by a UCI engine subprocess (Stockfish or compatible).
//!
//! One process serves the whole run. Every position is searched to a fixed depth; the
//! score and principal line of the last `info` line that carries a score are returned
//! together with the engine's `bestmove`.

use std::{
    io::{BufRead as _, BufReader, Write as _},
    path::PathBuf,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use oxicoach_board::{Move, Position};
use oxicoach_tactics::evaluation::{Evaluation, EvaluationError, EvaluationPort, Score};

#[derive(Debug, Clone, clap::Args)]
pub struct EngineArg {
    /// Path of the UCI engine executable
    #[arg(long = "engine", default_value = "stockfish")]
    pub path: PathBuf,
    /// Search depth per position
    #[arg(long, default_value_t = 12)]
    pub depth: u32,
    /// Engine threads
    #[arg(long, default_value_t = 1)]
    pub threads: u32,
}

pub struct UciEngine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    depth: u32,
}

impl UciEngine {
    pub fn spawn(arg: &EngineArg) -> Result<Self, EvaluationError> {
        let mut child = Command::new(&arg.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EvaluationError::Unavailable {
                reason: format!("cannot start {}: {e}", arg.path.display()),
            })?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(EvaluationError::Unavailable {
                reason: "engine pipes are not available".to_owned(),
            });
        };
        let mut engine = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            depth: arg.depth,
        };

        engine.send("uci")?;
        engine.wait_for("uciok")?;
        engine.send(&format!("setoption name Threads value {}", arg.threads))?;
        engine.send("isready")?;
        engine.wait_for("readyok")?;
        tracing::info!(engine = %arg.path.display(), depth = arg.depth, "engine ready");
        Ok(engine)
    }

    fn send(&mut self, command: &str) -> Result<(), EvaluationError> {
        writeln!(self.stdin, "{command}").map_err(EvaluationError::Io)?;
        self.stdin.flush().map_err(EvaluationError::Io)
    }

    fn read_line(&mut self) -> Result<String, EvaluationError> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .map_err(EvaluationError::Io)?;
        if read == 0 {
            return Err(EvaluationError::Unavailable {
                reason: "engine closed its output".to_owned(),
            });
        }
        Ok(line.trim_end().to_owned())
    }

    fn wait_for(&mut self, token: &str) -> Result<(), EvaluationError> {
        loop {
            if self.read_line()? == token {
                return Ok(());
            }
        }
    }
}

impl EvaluationPort for UciEngine {
    fn analyze(&mut self, position: &Position) -> Result<Evaluation, EvaluationError> {
        self.send(&format!("position fen {}", position.to_fen()))?;
        self.send(&format!("go depth {}", self.depth))?;

        let mut last_info: Option<InfoLine> = None;
        loop {
            let line = self.read_line()?;
            if line.starts_with("info ") {
                if let Some(info) = parse_info(&line) {
                    last_info = Some(info);
                }
            } else if line.starts_with("bestmove") {
                let best_move = parse_bestmove(&line)?;
                let info = last_info.ok_or(EvaluationError::Protocol { output: line })?;
                return Ok(Evaluation {
                    score: info.score,
                    best_move,
                    pv: info.pv,
                });
            }
        }
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        if self.send("quit").is_err() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InfoLine {
    score: Score,
    pv: Vec<Move>,
}

/// Score and principal line of an `info` line; `None` for lines without a score.
fn parse_info(line: &str) -> Option<InfoLine> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let score_at = tokens.iter().position(|&token| token == "score")?;
    let value: i32 = tokens.get(score_at + 2)?.parse().ok()?;
    let score = match *tokens.get(score_at + 1)? {
        "cp" => Score::Centipawns(value),
        "mate" => Score::MateIn(value),
        _ => return None,
    };
    let pv = tokens
        .iter()
        .position(|&token| token == "pv")
        .map(|pv_at| {
            tokens[pv_at + 1..]
                .iter()
                .map_while(|token| Move::from_uci(token).ok())
                .collect()
        })
        .unwrap_or_default();
    Some(InfoLine { score, pv })
}

/// Move of a `bestmove` line; `None` when the engine reports no legal move.
fn parse_bestmove(line: &str) -> Result<Option<Move>, EvaluationError> {
    let Some(token) = line.split_whitespace().nth(1) else {
        return Err(EvaluationError::Protocol {
            output: line.to_owned(),
        });
    };
    if token == "(none)" {
        return Ok(None);
    }
    Move::from_uci(token)
        .map(Some)
        .map_err(|_| EvaluationError::Protocol {
            output: line.to_owned(),
        })
}
