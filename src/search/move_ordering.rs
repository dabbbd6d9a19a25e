//! Move ordering: MVV-LVA, static exchange evaluation, killers and history.
//!
//! Ordering never changes the value alpha-beta computes, only how quickly
//! cutoffs arrive, so every table here is a pure speed heuristic.

use crate::game_state::bitboard::BitBoard;
use crate::game_state::chess_rules::en_passant_capture_square;
use crate::game_state::chess_types::{Piece, PieceKind, Side, Square};
use crate::game_state::position::Position;
use crate::moves::attack_tables::AttackTables;
use crate::moves::move_descriptions::Move;
use crate::search::search_config::{SearchConfig, MAX_DEPTH_CEILING};

const TT_MOVE_SCORE: i32 = 4_000_000;
const GOOD_CAPTURE_BASE: i32 = 1_000_000;
const PROMOTION_BASE: i32 = 900_000;
const FIRST_KILLER_SCORE: i32 = 800_000;
const SECOND_KILLER_SCORE: i32 = 790_000;
const BAD_CAPTURE_BASE: i32 = -1_000_000;

/// Exchange values in centipawns.
const SEE_VALUES: [i32; 6] = [100, 300, 300, 500, 900, 10_000];

/// `[victim][attacker]`: most valuable victim first, least valuable attacker breaks ties.
const MVV_LVA: [[i32; 6]; 6] = build_mvv_lva();

const fn build_mvv_lva() -> [[i32; 6]; 6] {
    let mut table = [[0i32; 6]; 6];
    let mut victim = 0;
    while victim < 6 {
        let mut attacker = 0;
        while attacker < 6 {
            table[victim][attacker] = (victim as i32 + 1) * 100 - (attacker as i32 + 1);
            attacker += 1;
        }
        victim += 1;
    }
    table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredMove {
    pub mv: Move,
    pub score: i32,
}

impl ScoredMove {
    /// Capture that loses material by static exchange.
    #[inline]
    pub fn is_bad_capture(&self) -> bool {
        self.mv.is_capture() && self.score < 0
    }
}

/// Piece captured by `mv`, if any.
#[inline]
pub fn captured_kind(position: &Position, mv: Move) -> Option<PieceKind> {
    if mv.is_en_passant() {
        return Some(PieceKind::Pawn);
    }
    if !mv.is_capture() {
        return None;
    }
    position.piece_at(mv.target()).map(|piece| piece.kind())
}

#[inline]
pub fn mvv_lva(position: &Position, mv: Move) -> i32 {
    captured_kind(position, mv)
        .map(|victim| MVV_LVA[victim.index()][mv.piece().kind().index()])
        .unwrap_or(0)
}

/// Static exchange evaluation of `mv` on its target square.
///
/// Plays out the capture sequence with each side recapturing with its least
/// valuable attacker, letting either side stop when continuing would lose.
/// X-ray attackers behind moved sliders are revealed as pieces leave the
/// occupancy.
pub fn see(position: &Position, tables: &AttackTables, mv: Move) -> i32 {
    let target = mv.target();
    let pieces = position.pieces();
    let mut occupied = position.occupancy()[Side::Both.index()].without(mv.source());
    if mv.is_en_passant() {
        occupied = occupied.without(en_passant_capture_square(mv.piece().side(), target));
    }

    let mut gain = [0i32; 32];
    gain[0] = captured_kind(position, mv).map_or(0, |kind| SEE_VALUES[kind.index()]);
    let mut on_square = mv.piece().kind();
    if let Some(promoted) = mv.promoted_piece() {
        gain[0] += SEE_VALUES[promoted.kind().index()] - SEE_VALUES[PieceKind::Pawn.index()];
        on_square = promoted.kind();
    }

    let mut side = mv.piece().side().opposite();
    let mut depth = 0usize;
    loop {
        let attackers = tables.attackers_to(target, occupied, pieces);
        let Some((square, kind)) = least_valuable_attacker(position, attackers, side) else {
            break;
        };
        depth += 1;
        if depth >= gain.len() {
            break;
        }
        gain[depth] = SEE_VALUES[on_square.index()] - gain[depth - 1];
        if gain[depth].max(-gain[depth - 1]) < 0 {
            break;
        }
        occupied = occupied.without(square);
        on_square = kind;
        side = side.opposite();
    }

    while depth > 0 {
        gain[depth - 1] = -(-gain[depth - 1]).max(gain[depth]);
        depth -= 1;
    }
    gain[0]
}

fn least_valuable_attacker(
    position: &Position,
    attackers: BitBoard,
    side: Side,
) -> Option<(Square, PieceKind)> {
    PieceKind::ALL.into_iter().find_map(|kind| {
        (position.piece_board(Piece::new(side, kind)) & attackers)
            .lsb()
            .map(|square| (square, kind))
    })
}

/// Killer moves per ply and the butterfly history table.
#[derive(Debug, Clone)]
pub struct MoveOrdering {
    killers: Vec<[Option<Move>; 2]>,
    /// `[piece][target]`
    history: Box<[[i32; 64]; 12]>,
}

impl Default for MoveOrdering {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveOrdering {
    pub fn new() -> Self {
        Self {
            killers: vec![[None; 2]; usize::from(MAX_DEPTH_CEILING) + 1],
            history: Box::new([[0; 64]; 12]),
        }
    }

    /// Forget everything; used between games.
    pub fn clear(&mut self) {
        self.killers.fill([None; 2]);
        self.history.iter_mut().for_each(|row| row.fill(0));
    }

    pub fn clear_killers(&mut self) {
        self.killers.fill([None; 2]);
    }

    #[inline]
    pub fn killers_at(&self, ply: usize) -> [Option<Move>; 2] {
        self.killers.get(ply).copied().unwrap_or([None; 2])
    }

    pub fn record_killer(&mut self, ply: usize, mv: Move) {
        let Some(slot) = self.killers.get_mut(ply) else {
            return;
        };
        if slot[0] != Some(mv) {
            slot[1] = slot[0];
            slot[0] = Some(mv);
        }
    }

    #[inline]
    pub fn history(&self, mv: Move) -> i32 {
        self.history[mv.piece().index()][usize::from(mv.target())]
    }

    /// Reward the quiet move that caused a cutoff and penalise the quiets tried before it.
    pub fn record_quiet_cutoff(&mut self, best: Move, tried: &[Move], depth: u8, config: &SearchConfig) {
        let bonus = history_bonus(depth, config);
        self.apply_history(best, bonus, config.history_max_move_value);
        for &mv in tried.iter().filter(|&&mv| mv != best && mv.is_quiet()) {
            self.apply_history(mv, -bonus, config.history_max_move_value);
        }
    }

    // Gravity update: values saturate toward +-max instead of growing without bound.
    fn apply_history(&mut self, mv: Move, bonus: i32, max_value: i32) {
        let entry = &mut self.history[mv.piece().index()][usize::from(mv.target())];
        *entry += bonus - *entry * bonus.abs() / max_value.max(1);
    }

    /// Score and sort moves, best first.
    pub fn order(
        &self,
        position: &Position,
        tables: &AttackTables,
        moves: &[Move],
        tt_move: Option<Move>,
        ply: usize,
        config: &SearchConfig,
    ) -> Vec<ScoredMove> {
        let killers = self.killers_at(ply);
        let mut scored: Vec<ScoredMove> = moves
            .iter()
            .map(|&mv| ScoredMove {
                mv,
                score: self.score_move(position, tables, mv, tt_move, killers, config),
            })
            .collect();
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }

    fn score_move(
        &self,
        position: &Position,
        tables: &AttackTables,
        mv: Move,
        tt_move: Option<Move>,
        killers: [Option<Move>; 2],
        config: &SearchConfig,
    ) -> i32 {
        if Some(mv) == tt_move {
            return TT_MOVE_SCORE;
        }
        if mv.is_capture() {
            let order = mvv_lva(position, mv);
            if config.see_ordering && see(position, tables, mv) < 0 {
                return BAD_CAPTURE_BASE + order;
            }
            return GOOD_CAPTURE_BASE + order;
        }
        if let Some(promoted) = mv.promoted_piece() {
            return PROMOTION_BASE + SEE_VALUES[promoted.kind().index()];
        }
        if !config.history_ordering {
            return 0;
        }
        if Some(mv) == killers[0] {
            FIRST_KILLER_SCORE
        } else if Some(mv) == killers[1] {
            SECOND_KILLER_SCORE
        } else {
            self.history(mv)
        }
    }
}

/// Quiescence ordering: captures only, MVV-LVA.
pub fn order_captures(position: &Position, moves: &mut [Move]) {
    moves.sort_by_key(|&mv| -mvv_lva(position, mv));
}

#[inline]
fn history_bonus(depth: u8, config: &SearchConfig) -> i32 {
    let depth = i32::from(depth);
    (4 * depth * depth + 120 * depth - 120).clamp(0, config.history_max_move_raw_bonus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{find_move, tables};

    #[test]
    fn mvv_lva_prefers_valuable_victims_and_cheap_attackers() {
        let pawn_takes_queen = MVV_LVA[PieceKind::Queen.index()][PieceKind::Pawn.index()];
        let queen_takes_queen = MVV_LVA[PieceKind::Queen.index()][PieceKind::Queen.index()];
        let queen_takes_rook = MVV_LVA[PieceKind::Rook.index()][PieceKind::Queen.index()];
        assert!(pawn_takes_queen > queen_takes_queen);
        assert!(queen_takes_queen > queen_takes_rook);
    }

    #[test]
    fn see_of_undefended_capture_is_victim_value() {
        let tables = tables();
        let position = Position::from_fen("4k3/8/8/3p4/8/8/8/3RK3 w - - 0 1").expect("fen should parse");
        let mv = find_move(&position, tables, "d1d5");
        assert_eq!(see(&position, tables, mv), 100);
    }

    #[test]
    fn see_of_defended_pawn_taken_by_rook_is_negative() {
        let tables = tables();
        let position = Position::from_fen("4k3/8/2p5/3p4/8/8/8/3RK3 w - - 0 1").expect("fen should parse");
        let mv = find_move(&position, tables, "d1d5");
        assert_eq!(see(&position, tables, mv), 100 - 500);
    }

    #[test]
    fn see_counts_xray_recaptures() {
        let tables = tables();
        // Doubled rooks win the d5 pawn despite one defender.
        let position =
            Position::from_fen("3rk3/8/8/3p4/8/8/3R4/3RK3 w - - 0 1").expect("fen should parse");
        let mv = find_move(&position, tables, "d2d5");
        assert_eq!(see(&position, tables, mv), 100);
    }

    #[test]
    fn ordering_puts_tt_move_first_and_bad_captures_last() {
        let tables = tables();
        let position =
            Position::from_fen("4k3/8/2p5/3p4/6n1/8/8/3RK1R1 w - - 0 1").expect("fen should parse");
        let moves = crate::move_generation::move_generator::generate_moves(&position, tables, false);
        let tt_move = find_move(&position, tables, "e1e2");
        let config = SearchConfig::default();

        let ordering = MoveOrdering::new();
        let ordered = ordering.order(&position, tables, &moves, Some(tt_move), 0, &config);

        assert_eq!(ordered[0].mv, tt_move);
        // The hanging knight comes before anything quiet.
        assert_eq!(ordered[1].mv, find_move(&position, tables, "g1g4"));
        assert!(!ordered[1].is_bad_capture());
        let last = ordered.last().expect("moves exist");
        assert_eq!(last.mv.to_string(), "d1d5");
        assert!(last.is_bad_capture());
    }

    #[test]
    fn killers_shift_and_history_saturates() {
        let tables = tables();
        let position = Position::start();
        let e4 = find_move(&position, tables, "e2e4");
        let d4 = find_move(&position, tables, "d2d4");
        let nf3 = find_move(&position, tables, "g1f3");
        let config = SearchConfig::default();

        let mut ordering = MoveOrdering::new();
        ordering.record_killer(3, e4);
        ordering.record_killer(3, e4);
        assert_eq!(ordering.killers_at(3), [Some(e4), None]);
        ordering.record_killer(3, d4);
        assert_eq!(ordering.killers_at(3), [Some(d4), Some(e4)]);

        for _ in 0..200 {
            ordering.record_quiet_cutoff(nf3, &[e4, nf3], 12, &config);
        }
        assert!(ordering.history(nf3) > 0);
        assert!(ordering.history(nf3) <= config.history_max_move_value);
        assert!(ordering.history(e4) < 0);
        assert!(ordering.history(e4) >= -config.history_max_move_value);

        ordering.clear();
        assert_eq!(ordering.history(nf3), 0);
        assert_eq!(ordering.killers_at(3), [None, None]);
    }
}
