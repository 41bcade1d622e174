mod test_heap;
