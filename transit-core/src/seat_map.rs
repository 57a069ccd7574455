use serde::{Deserialize, Serialize};

use crate::{BookingError, CoreResult};

/// Coaches use a 2+2 layout: window, aisle | aisle, window.
pub const SEATS_PER_ROW: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatKind {
    Window,
    Aisle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub number: u32,
    pub row: u32,
    pub position: u32,
    pub kind: SeatKind,
}

impl Seat {
    /// Layout attributes are a pure function of the seat number.
    pub fn new(number: u32) -> Self {
        debug_assert!(number >= 1);
        let row = number.div_ceil(SEATS_PER_ROW);
        let position = (number - 1) % SEATS_PER_ROW + 1;
        let kind = if position == 1 || position == SEATS_PER_ROW {
            SeatKind::Window
        } else {
            SeatKind::Aisle
        };

        Self { number, row, position, kind }
    }

    pub fn is_window(&self) -> bool {
        self.kind == SeatKind::Window
    }
}

/// Seats `1..=capacity` in order. The last row is left partially filled
/// when the capacity is not a multiple of four.
pub fn generate_seat_map(capacity: i32) -> CoreResult<Vec<Seat>> {
    if capacity <= 0 {
        return Err(BookingError::InvalidCapacity(capacity as i64));
    }

    Ok((1..=capacity as u32).map(Seat::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forty_seat_layout() {
        let seats = generate_seat_map(40).unwrap();
        assert_eq!(seats.len(), 40);

        assert_eq!(seats[0], Seat { number: 1, row: 1, position: 1, kind: SeatKind::Window });
        assert_eq!(seats[1].kind, SeatKind::Aisle);
        assert_eq!(seats[2].kind, SeatKind::Aisle);
        assert_eq!(seats[3], Seat { number: 4, row: 1, position: 4, kind: SeatKind::Window });
        assert_eq!(seats[39], Seat { number: 40, row: 10, position: 4, kind: SeatKind::Window });
    }

    #[test]
    fn test_numbering_and_rows_for_all_small_capacities() {
        for capacity in 1..=120 {
            let seats = generate_seat_map(capacity).unwrap();
            assert_eq!(seats.len(), capacity as usize);
            for (i, seat) in seats.iter().enumerate() {
                let number = i as u32 + 1;
                assert_eq!(seat.number, number);
                assert_eq!(seat.row, (number + 3) / 4);
            }
        }
    }

    #[test]
    fn test_partial_last_row() {
        let seats = generate_seat_map(42).unwrap();
        let last_row: Vec<_> = seats.iter().filter(|s| s.row == 11).collect();
        assert_eq!(last_row.len(), 2);
        assert_eq!(last_row[0].position, 1);
        assert!(last_row[0].is_window());
        assert_eq!(last_row[1].position, 2);
        assert_eq!(seats.last().map(|s| s.row), Some(11));
    }

    #[test]
    fn test_invalid_capacity() {
        assert_eq!(generate_seat_map(0), Err(BookingError::InvalidCapacity(0)));
        assert_eq!(generate_seat_map(-3), Err(BookingError::InvalidCapacity(-3)));
    }
}
