use crate::error::EfacError;
use crate::systems::EnergySystemElement;
use glam::DVec2;
use tracing::debug;

/// A row of interchangeable elements of which exactly one is selected.
///
/// The selected element sits at the carousel's position and is the only active
/// one; switching deactivates the old selection before activating the new one.
#[derive(Debug)]
pub struct EnergySystemElementCarousel {
    elements: Vec<Box<dyn EnergySystemElement>>,
    target_index: usize,
    position: DVec2,
}

impl EnergySystemElementCarousel {
    /// Place every element at `position` and activate the first one.
    pub fn new(mut elements: Vec<Box<dyn EnergySystemElement>>, position: DVec2) -> Result<Self, EfacError> {
        let Some(first) = elements.first_mut() else {
            return Err(EfacError::InvalidConfig("a carousel needs at least one element"));
        };
        first.activate();
        for element in &mut elements {
            element.set_position(position);
        }
        Ok(Self {
            elements,
            target_index: 0,
            position,
        })
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn elements(&self) -> impl Iterator<Item = &dyn EnergySystemElement> {
        self.elements.iter().map(|element| element.as_ref())
    }

    pub fn selected(&self) -> &dyn EnergySystemElement {
        self.elements[self.target_index].as_ref()
    }

    pub fn selected_mut(&mut self) -> &mut dyn EnergySystemElement {
        self.elements[self.target_index].as_mut()
    }

    /// Select another element. Returns whether the selection changed.
    pub fn set_target_index(&mut self, index: usize) -> Result<bool, EfacError> {
        if index >= self.elements.len() {
            return Err(EfacError::IndexOutOfRange {
                index,
                len: self.elements.len(),
            });
        }
        if index == self.target_index {
            return Ok(false);
        }
        let previous = &mut self.elements[self.target_index];
        previous.deactivate();
        debug!(element = previous.name(), "element deactivated");

        self.target_index = index;
        self.elements[index].activate();
        Ok(true)
    }

    /// First element of type `T`, selected or not.
    pub fn find<T: 'static>(&self) -> Option<&T> {
        self.elements.iter().find_map(|element| element.as_any().downcast_ref::<T>())
    }

    pub fn find_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.elements
            .iter_mut()
            .find_map(|element| element.as_any_mut().downcast_mut::<T>())
    }

    pub(crate) fn elements_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn EnergySystemElement>> {
        self.elements.iter_mut()
    }
}
