// The tower grid.
//
// A fixed `width × height` grid stored row-major, each cell either empty or
// holding a `TowerRecord` whose `x`/`y` match the cell. Out-of-bounds
// coordinates never panic: lookups return `None` and writes are ignored,
// which is how a snapshot or broadcast from a mismatched grid degrades.

use bulwark_protocol::{TowerOwner, TowerRecord};

#[derive(Clone, Debug, PartialEq)]
pub struct TowerMap {
    width: u32,
    height: u32,
    cells: Vec<Option<TowerRecord>>,
}

impl TowerMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        self.contains(x, y)
            .then_some(x as usize + y as usize * self.width as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&TowerRecord> {
        self.index(x, y).and_then(|i| self.cells[i].as_ref())
    }

    pub fn is_occupied(&self, x: u32, y: u32) -> bool {
        self.get(x, y).is_some()
    }

    /// Put `tower` at its own coordinates, returning whatever was there.
    /// Ignored if the coordinates are outside the grid.
    pub fn place(&mut self, tower: TowerRecord) -> Option<TowerRecord> {
        let i = self.index(tower.x, tower.y)?;
        self.cells[i].replace(tower)
    }

    /// Empty the cell, returning the tower that was there.
    pub fn remove(&mut self, x: u32, y: u32) -> Option<TowerRecord> {
        let i = self.index(x, y)?;
        self.cells[i].take()
    }

    /// Remove every tower, returning them in row-major order.
    pub fn clear(&mut self) -> Vec<TowerRecord> {
        self.cells.iter_mut().filter_map(Option::take).collect()
    }

    /// All towers in row-major order.
    pub fn towers(&self) -> impl Iterator<Item = &TowerRecord> {
        self.cells.iter().flatten()
    }

    /// Cells holding a tower owned by `owner`, row-major.
    pub fn cells_owned_by(&self, owner: TowerOwner) -> Vec<(u32, u32)> {
        self.towers()
            .filter(|t| t.owner == owner)
            .map(|t| (t.x, t.y))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.towers().count()
    }

    pub fn is_empty(&self) -> bool {
        self.towers().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use bulwark_protocol::ConnectionId;

    use super::*;

    fn tower(x: u32, y: u32, owner: TowerOwner) -> TowerRecord {
        TowerRecord {
            stats_index: 0,
            x,
            y,
            owner,
        }
    }

    #[test]
    fn place_get_remove() {
        let mut map = TowerMap::new(4, 2);
        assert_eq!((map.width(), map.height()), (4, 2));
        assert_eq!(map.place(tower(3, 1, TowerOwner::Local)), None);
        assert!(map.is_occupied(3, 1));
        assert_eq!(map.get(3, 1).map(|t| t.owner), Some(TowerOwner::Local));
        assert_eq!(map.remove(3, 1), Some(tower(3, 1, TowerOwner::Local)));
        assert!(map.is_empty());
    }

    #[test]
    fn place_replaces_previous_occupant() {
        let mut map = TowerMap::new(4, 2);
        let b = TowerOwner::Connection(ConnectionId(1));
        map.place(tower(0, 0, TowerOwner::Local));
        assert_eq!(map.place(tower(0, 0, b)), Some(tower(0, 0, TowerOwner::Local)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn out_of_bounds_is_ignored() {
        let mut map = TowerMap::new(4, 2);
        assert!(!map.contains(4, 0));
        assert!(!map.contains(0, 2));
        assert_eq!(map.place(tower(4, 0, TowerOwner::Local)), None);
        assert_eq!(map.get(4, 0), None);
        assert_eq!(map.remove(9, 9), None);
        assert!(map.is_empty());
    }

    #[test]
    fn ownership_query_is_row_major() {
        let mut map = TowerMap::new(4, 2);
        let b = TowerOwner::Connection(ConnectionId(1));
        let c = TowerOwner::Connection(ConnectionId(2));
        map.place(tower(2, 1, b));
        map.place(tower(1, 0, c));
        map.place(tower(3, 0, b));
        assert_eq!(map.cells_owned_by(b), vec![(3, 0), (2, 1)]);
        assert_eq!(map.clear().len(), 3);
        assert!(map.is_empty());
    }
}
