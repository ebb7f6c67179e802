//! Сетка мест зала.
//!
//! Места не хранятся в БД как отдельные сущности: номер места однозначно
//! раскладывается в (ряд, место в ряду, категория) по фиксированной сетке.
//! Номера мест начинаются с 1 и идут по рядам слева направо.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatGrid {
    pub rows: u8,
    pub seats_per_row: i32,
    pub premium_rows: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatTier {
    Premium,
    Regular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatPosition {
    pub seat_id: i32,
    pub row_letter: char,
    pub seat_number: i32,
    pub seat_type: SeatTier,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    #[serde(flatten)]
    pub position: SeatPosition,
    pub is_active: bool,
    pub is_booked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatMap {
    pub seats_by_row: BTreeMap<String, Vec<SeatView>>,
    pub total_seats: usize,
    pub available_seats: usize,
    pub booked_seats: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeatSelectionError {
    #[error("At least one seat must be selected")]
    Empty,
    #[error("Seat {0} does not exist")]
    OutOfRange(i32),
    #[error("Seat {0} was selected more than once")]
    Duplicate(i32),
    #[error("At most {max} seats can be booked at once, got {requested}")]
    TooMany { requested: usize, max: usize },
}

impl SeatGrid {
    /// Стандартный зал: ряды A..J по 15 мест, первые три ряда - премиум.
    pub const STANDARD: SeatGrid = SeatGrid {
        rows: 10,
        seats_per_row: 15,
        premium_rows: 3,
    };

    pub fn capacity(&self) -> i32 {
        i32::from(self.rows) * self.seats_per_row
    }

    pub fn position(&self, seat_id: i32) -> Option<SeatPosition> {
        if seat_id < 1 || seat_id > self.capacity() {
            return None;
        }
        let row_index = (seat_id - 1) / self.seats_per_row;
        // row_index < rows <= 26, в u8 влезает
        let row_index = row_index as u8;
        Some(SeatPosition {
            seat_id,
            row_letter: char::from(b'A' + row_index),
            seat_number: (seat_id - 1) % self.seats_per_row + 1,
            seat_type: if row_index < self.premium_rows {
                SeatTier::Premium
            } else {
                SeatTier::Regular
            },
        })
    }

    pub fn seat_id(&self, row_letter: char, seat_number: i32) -> Option<i32> {
        let upper = row_letter.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return None;
        }
        let row_index = upper as u8 - b'A';
        if row_index >= self.rows || seat_number < 1 || seat_number > self.seats_per_row {
            return None;
        }
        Some(i32::from(row_index) * self.seats_per_row + seat_number)
    }

    /// Раскладка зала с отметкой занятых мест. Номера вне сетки игнорируются.
    pub fn seat_map(&self, booked: &HashSet<i32>) -> SeatMap {
        let mut seats_by_row: BTreeMap<String, Vec<SeatView>> = BTreeMap::new();
        let mut booked_count = 0;

        for seat_id in 1..=self.capacity() {
            let Some(position) = self.position(seat_id) else {
                continue;
            };
            let is_booked = booked.contains(&seat_id);
            if is_booked {
                booked_count += 1;
            }
            seats_by_row
                .entry(position.row_letter.to_string())
                .or_default()
                .push(SeatView {
                    position,
                    is_active: true,
                    is_booked,
                });
        }

        let total = self.capacity() as usize;
        SeatMap {
            seats_by_row,
            total_seats: total,
            available_seats: total - booked_count,
            booked_seats: booked_count,
        }
    }

    /// Проверяет выбор пользователя и возвращает отсортированные номера мест.
    pub fn validate_selection(
        &self,
        requested: &[i32],
        max: usize,
    ) -> Result<Vec<i32>, SeatSelectionError> {
        if requested.is_empty() {
            return Err(SeatSelectionError::Empty);
        }
        if requested.len() > max {
            return Err(SeatSelectionError::TooMany {
                requested: requested.len(),
                max,
            });
        }

        let mut seen = HashSet::with_capacity(requested.len());
        for &seat in requested {
            if self.position(seat).is_none() {
                return Err(SeatSelectionError::OutOfRange(seat));
            }
            if !seen.insert(seat) {
                return Err(SeatSelectionError::Duplicate(seat));
            }
        }

        let mut seats = requested.to_vec();
        seats.sort_unstable();
        Ok(seats)
    }
}

impl Default for SeatGrid {
    fn default() -> Self {
        SeatGrid::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GRID: SeatGrid = SeatGrid::STANDARD;

    #[test]
    fn first_and_last_seats() {
        let first = GRID.position(1).unwrap();
        assert_eq!((first.row_letter, first.seat_number), ('A', 1));
        assert_eq!(first.seat_type, SeatTier::Premium);

        let last = GRID.position(150).unwrap();
        assert_eq!((last.row_letter, last.seat_number), ('J', 15));
        assert_eq!(last.seat_type, SeatTier::Regular);
    }

    #[test]
    fn premium_boundary_is_after_row_c() {
        assert_eq!(GRID.position(45).unwrap().row_letter, 'C');
        assert_eq!(GRID.position(45).unwrap().seat_type, SeatTier::Premium);
        assert_eq!(GRID.position(46).unwrap().row_letter, 'D');
        assert_eq!(GRID.position(46).unwrap().seat_type, SeatTier::Regular);
    }

    #[test]
    fn outside_the_grid_has_no_position() {
        assert!(GRID.position(0).is_none());
        assert!(GRID.position(-4).is_none());
        assert!(GRID.position(151).is_none());
        assert_eq!(GRID.seat_id('K', 1), None);
        assert_eq!(GRID.seat_id('a', 16), None);
        assert_eq!(GRID.seat_id('b', 2), Some(17));
    }

    #[test]
    fn seat_map_counts_booked_seats() {
        let booked: HashSet<i32> = [1, 2, 149, 500].into_iter().collect();
        let map = GRID.seat_map(&booked);

        assert_eq!(map.total_seats, 150);
        assert_eq!(map.booked_seats, 3);
        assert_eq!(map.available_seats, 147);
        assert_eq!(map.seats_by_row.len(), 10);
        assert!(map.seats_by_row["A"][0].is_booked);
        assert!(!map.seats_by_row["A"][2].is_booked);
        assert!(map.seats_by_row["J"][13].is_booked);
    }

    #[test]
    fn seat_map_serializes_like_the_client_expects() {
        let map = GRID.seat_map(&HashSet::from([16]));
        let json = serde_json::to_value(&map).unwrap();

        assert_eq!(json["totalSeats"], 150);
        assert_eq!(json["availableSeats"], 149);
        let seat = &json["seatsByRow"]["B"][0];
        assert_eq!(seat["seat_id"], 16);
        assert_eq!(seat["row_letter"], "B");
        assert_eq!(seat["seat_number"], 1);
        assert_eq!(seat["seat_type"], "premium");
        assert_eq!(seat["is_active"], true);
        assert_eq!(seat["is_booked"], true);
    }

    #[test]
    fn selection_is_sorted() {
        assert_eq!(GRID.validate_selection(&[30, 4, 12], 10), Ok(vec![4, 12, 30]));
    }

    #[test]
    fn selection_errors() {
        assert_eq!(GRID.validate_selection(&[], 10), Err(SeatSelectionError::Empty));
        assert_eq!(
            GRID.validate_selection(&[1, 151], 10),
            Err(SeatSelectionError::OutOfRange(151))
        );
        assert_eq!(
            GRID.validate_selection(&[5, 6, 5], 10),
            Err(SeatSelectionError::Duplicate(5))
        );
        assert_eq!(
            GRID.validate_selection(&[1, 2, 3], 2),
            Err(SeatSelectionError::TooMany { requested: 3, max: 2 })
        );
    }

    proptest! {
        #[test]
        fn every_grid_seat_maps_back_to_itself(seat in 1i32..=150) {
            let pos = GRID.position(seat).unwrap();
            prop_assert_eq!(GRID.seat_id(pos.row_letter, pos.seat_number), Some(seat));
            prop_assert!((1..=15).contains(&pos.seat_number));
        }

        #[test]
        fn seat_map_partitions_capacity(booked in proptest::collection::hash_set(-20i32..200, 0..60)) {
            let map = GRID.seat_map(&booked);
            let in_grid = booked.iter().filter(|s| (1..=150).contains(*s)).count();
            prop_assert_eq!(map.booked_seats, in_grid);
            prop_assert_eq!(map.available_seats + map.booked_seats, map.total_seats);
        }
    }
}
